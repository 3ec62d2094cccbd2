//! Sizing of the network endpoint and the report quorum.
//!
//! The endpoint limits are derived from the plugin's declared maximum lengths
//! and the configured protocol deltas: every message type gets a worst-case
//! encoded length, and the rate limits allow the honest message pattern of
//! one oracle with a safety factor of two.

use crate::error::{ManagedError, ManagedResult};
use ocrnode_config::PublicConfig;
use ocrnode_types::{
    BinaryNetworkEndpointLimits, ReportingPluginLimits, MAX_MAX_OBSERVATION_LENGTH,
    MAX_MAX_QUERY_LENGTH, MAX_MAX_REPORT_LENGTH,
};
use std::time::Duration;

/// Allowance for framing, epoch/round numbers and signatures on top of the
/// variable-length payload of a message.
pub const OVERHEAD: usize = 256;

/// Allowance for the signature and signer index of one signed observation.
const SIGNED_OBSERVATION_OVERHEAD: usize = 64;

/// Safety factor applied to every rate and capacity.
const SAFETY_MARGIN: usize = 2;

/// Reject plugin limits above the protocol maxima.
pub fn validate_plugin_limits(limits: &ReportingPluginLimits) -> ManagedResult<()> {
    let checks = [
        ("max_query_length", limits.max_query_length, MAX_MAX_QUERY_LENGTH),
        (
            "max_observation_length",
            limits.max_observation_length,
            MAX_MAX_OBSERVATION_LENGTH,
        ),
        ("max_report_length", limits.max_report_length, MAX_MAX_REPORT_LENGTH),
    ];
    for (name, value, max) in checks {
        if value > max {
            return Err(ManagedError::PluginLimit { name, value, max });
        }
    }
    Ok(())
}

/// Number of signatures a finalized report must carry.
///
/// Plugins that produce at most one report per round need a Byzantine quorum
/// so that two conflicting reports can never both be attested.
pub fn report_quorum(n: usize, f: usize, unique_reports: bool) -> usize {
    if unique_reports {
        (n + f) / 2 + 1
    } else {
        f + 1
    }
}

fn per_second(delta: Duration) -> f64 {
    let secs = delta.as_secs_f64();
    if secs > 0.0 {
        1.0 / secs
    } else {
        f64::INFINITY
    }
}

/// Worst-case encoded length of every message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLengths {
    /// `NewEpoch`
    pub new_epoch: usize,
    /// `ObserveReq`
    pub observe_req: usize,
    /// `Observe`
    pub observe: usize,
    /// `ReportReq`
    pub report_req: usize,
    /// `Report`
    pub report: usize,
    /// `Final`
    pub final_: usize,
    /// `FinalEcho`
    pub final_echo: usize,
}

impl MessageLengths {
    /// Lengths for a configuration of `n` oracles.
    pub fn new(limits: &ReportingPluginLimits, max_signature_length: usize, n: usize) -> Self {
        let final_ = limits
            .max_report_length
            .saturating_add(max_signature_length.saturating_mul(n))
            .saturating_add(OVERHEAD);
        Self {
            new_epoch: OVERHEAD,
            observe_req: limits.max_query_length.saturating_add(OVERHEAD),
            observe: limits.max_observation_length.saturating_add(OVERHEAD),
            report_req: limits
                .max_observation_length
                .saturating_add(SIGNED_OBSERVATION_OVERHEAD)
                .saturating_mul(n)
                .saturating_add(OVERHEAD),
            report: limits
                .max_report_length
                .saturating_add(SIGNED_OBSERVATION_OVERHEAD)
                .saturating_add(OVERHEAD),
            final_,
            final_echo: final_,
        }
    }

    /// Largest of all message lengths.
    pub fn max(&self) -> usize {
        self.round_messages().into_iter().fold(self.new_epoch, usize::max)
    }

    /// Sum over the messages one oracle exchanges per round.
    fn round_sum(&self) -> usize {
        self.round_messages()
            .into_iter()
            .fold(0, usize::saturating_add)
    }

    fn round_messages(&self) -> [usize; 6] {
        [
            self.observe_req,
            self.observe,
            self.report_req,
            self.report,
            self.final_,
            self.final_echo,
        ]
    }
}

/// Limits of the binary endpoint for one configuration.
pub fn network_limits(
    config: &PublicConfig,
    limits: &ReportingPluginLimits,
    max_signature_length: usize,
) -> BinaryNetworkEndpointLimits {
    let lengths = MessageLengths::new(limits, max_signature_length, config.n());

    let resend = per_second(config.delta_resend);
    let progress = per_second(config.delta_progress);
    let round = per_second(config.delta_round);

    // NewEpoch on resend and on progress; per round one ObserveReq, three of
    // Observe/ReportReq/Report and two of Final/FinalEcho
    let messages_rate = (resend + progress + round + 3.0 * round + 2.0 * round) * SAFETY_MARGIN as f64;
    let messages_capacity = (2 + 6) * SAFETY_MARGIN;

    let bytes_rate = resend * lengths.new_epoch as f64
        + progress * lengths.new_epoch as f64
        + round * lengths.round_sum() as f64;
    let bytes_capacity = lengths
        .new_epoch
        .saturating_mul(2)
        .saturating_add(lengths.round_sum())
        .saturating_mul(SAFETY_MARGIN);

    BinaryNetworkEndpointLimits {
        max_message_length: lengths.max(),
        messages_rate,
        messages_capacity,
        bytes_rate,
        bytes_capacity,
    }
}
