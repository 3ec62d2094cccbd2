//! Reporting plugin descriptors and network limits.

use crate::{ConfigDigest, OracleId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on any plugin-declared maximum query length.
pub const MAX_MAX_QUERY_LENGTH: usize = 256 * 1024 * 1024;
/// Upper bound on any plugin-declared maximum observation length.
pub const MAX_MAX_OBSERVATION_LENGTH: usize = 256 * 1024 * 1024;
/// Upper bound on any plugin-declared maximum report length.
pub const MAX_MAX_REPORT_LENGTH: usize = 256 * 1024 * 1024;

/// Parameters a reporting plugin is instantiated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingPluginConfig {
    /// Digest of the configuration the plugin runs under
    pub config_digest: ConfigDigest,
    /// This oracle's id
    pub oracle_id: OracleId,
    /// Number of oracles
    pub n: usize,
    /// Maximum number of faulty oracles
    pub f: usize,
    /// Plugin configuration published onchain
    pub onchain_config: Vec<u8>,
    /// Plugin configuration published offchain
    pub offchain_config: Vec<u8>,
    /// Expected time between two rounds
    pub estimated_round_interval: Duration,
    /// Time budget of `query`
    pub max_duration_query: Duration,
    /// Time budget of `observation`
    pub max_duration_observation: Duration,
    /// Time budget of `report`
    pub max_duration_report: Duration,
    /// Time budget of `should_accept_finalized_report`
    pub max_duration_should_accept_finalized_report: Duration,
    /// Time budget of `should_transmit_accepted_report`
    pub max_duration_should_transmit_accepted_report: Duration,
}

/// Maximum sizes a plugin promises to respect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPluginLimits {
    /// Maximum query length in bytes
    pub max_query_length: usize,
    /// Maximum observation length in bytes
    pub max_observation_length: usize,
    /// Maximum report length in bytes
    pub max_report_length: usize,
}

/// Static description returned by a plugin factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPluginInfo {
    /// Human-readable plugin name, used in logs
    pub name: String,
    /// When set, no two distinct reports may be accepted for the same round
    pub unique_reports: bool,
    /// Size limits
    pub limits: ReportingPluginLimits,
}

/// Rate limits handed to the network layer for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinaryNetworkEndpointLimits {
    /// Largest message accepted, in bytes
    pub max_message_length: usize,
    /// Per-peer message rate, messages per second
    pub messages_rate: f64,
    /// Per-peer message burst capacity
    pub messages_capacity: usize,
    /// Per-peer byte rate, bytes per second
    pub bytes_rate: f64,
    /// Per-peer byte burst capacity
    pub bytes_capacity: usize,
}
