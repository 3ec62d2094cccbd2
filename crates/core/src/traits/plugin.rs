//! Reporting plugins decide what gets observed, reported and transmitted.

use async_trait::async_trait;
use ocrnode_types::{
    AttributedObservation, Observation, Query, Report, ReportTimestamp, ReportingPluginConfig,
    ReportingPluginInfo,
};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by reporting plugins.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The plugin could not be created from the given config.
    #[error("invalid plugin config: {0}")]
    InvalidConfig(String),

    /// A data source the plugin depends on failed.
    #[error("data source error: {0}")]
    DataSource(String),

    /// Any other plugin failure.
    #[error("plugin error: {0}")]
    Internal(String),
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Application logic plugged into the protocol.
///
/// Every hook is bounded by a time budget from the shared config; a hook that
/// exceeds it is abandoned.
#[async_trait]
pub trait ReportingPlugin: Send + Sync + 'static {
    /// Called once before any other hook.
    async fn start(&self) -> PluginResult<()> {
        Ok(())
    }

    /// Query for the round, chosen by the leader.
    async fn query(&self, ts: ReportTimestamp) -> PluginResult<Query>;

    /// This oracle's observation for `query`.
    async fn observation(&self, ts: ReportTimestamp, query: &[u8]) -> PluginResult<Observation>;

    /// Build a report from a set of observations. Returns `(false, _)` when no
    /// report should be produced this round.
    async fn report(
        &self,
        ts: ReportTimestamp,
        query: &[u8],
        observations: &[AttributedObservation],
    ) -> PluginResult<(bool, Report)>;

    /// Whether a finalized report should be scheduled for transmission.
    async fn should_accept_finalized_report(
        &self,
        ts: ReportTimestamp,
        report: &[u8],
    ) -> PluginResult<bool>;

    /// Whether a scheduled report should actually be transmitted now.
    async fn should_transmit_accepted_report(
        &self,
        ts: ReportTimestamp,
        report: &[u8],
    ) -> PluginResult<bool>;

    /// Release resources. No hook is called afterwards.
    async fn close(&self) -> PluginResult<()>;
}

/// Instantiates a plugin for each new configuration.
#[async_trait]
pub trait ReportingPluginFactory: Send + Sync + 'static {
    /// Create a plugin for `config`, returning it with its static description.
    async fn new_reporting_plugin(
        &self,
        config: ReportingPluginConfig,
    ) -> PluginResult<(Arc<dyn ReportingPlugin>, ReportingPluginInfo)>;
}
