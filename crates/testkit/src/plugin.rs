//! Reporting plugin double with switchable decisions.

use async_trait::async_trait;
use ocrnode_core::{PluginError, PluginResult, ReportingPlugin, ReportingPluginFactory};
use ocrnode_types::{
    AttributedObservation, Observation, Query, Report, ReportTimestamp, ReportingPluginConfig,
    ReportingPluginInfo, ReportingPluginLimits,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Plugin whose accept/transmit decisions are set by the test.
///
/// `report` concatenates the observations in observer order.
#[derive(Debug)]
pub struct MockReportingPlugin {
    accept: AtomicBool,
    transmit: AtomicBool,
    accepted: Mutex<Vec<ReportTimestamp>>,
    closed: AtomicUsize,
}

impl Default for MockReportingPlugin {
    fn default() -> Self {
        Self {
            accept: AtomicBool::new(true),
            transmit: AtomicBool::new(true),
            accepted: Mutex::new(Vec::new()),
            closed: AtomicUsize::new(0),
        }
    }
}

impl MockReportingPlugin {
    /// Plugin that accepts and transmits everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer of `should_accept_finalized_report`.
    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    /// Answer of `should_transmit_accepted_report`.
    pub fn set_transmit(&self, transmit: bool) {
        self.transmit.store(transmit, Ordering::SeqCst);
    }

    /// Rounds passed to `should_accept_finalized_report`.
    pub fn accept_calls(&self) -> Vec<ReportTimestamp> {
        self.accepted.lock().clone()
    }

    /// Number of `close` calls.
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportingPlugin for MockReportingPlugin {
    async fn query(&self, ts: ReportTimestamp) -> PluginResult<Query> {
        Ok(ts.round.to_be_bytes().to_vec())
    }

    async fn observation(&self, ts: ReportTimestamp, _query: &[u8]) -> PluginResult<Observation> {
        Ok(ts.epoch.to_be_bytes().to_vec())
    }

    async fn report(
        &self,
        _ts: ReportTimestamp,
        _query: &[u8],
        observations: &[AttributedObservation],
    ) -> PluginResult<(bool, Report)> {
        if observations.is_empty() {
            return Err(PluginError::Internal("no observations".to_string()));
        }
        let mut sorted: Vec<_> = observations.iter().collect();
        sorted.sort_by_key(|o| o.observer);
        Ok((true, sorted.into_iter().flat_map(|o| o.observation.clone()).collect()))
    }

    async fn should_accept_finalized_report(
        &self,
        ts: ReportTimestamp,
        _report: &[u8],
    ) -> PluginResult<bool> {
        self.accepted.lock().push(ts);
        Ok(self.accept.load(Ordering::SeqCst))
    }

    async fn should_transmit_accepted_report(
        &self,
        _ts: ReportTimestamp,
        _report: &[u8],
    ) -> PluginResult<bool> {
        Ok(self.transmit.load(Ordering::SeqCst))
    }

    async fn close(&self) -> PluginResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one shared [`MockReportingPlugin`] and records the configs it was asked for.
#[derive(Debug)]
pub struct MockReportingPluginFactory {
    /// The plugin every call returns
    pub plugin: Arc<MockReportingPlugin>,
    info: Mutex<ReportingPluginInfo>,
    configs: Mutex<Vec<ReportingPluginConfig>>,
    failures: AtomicUsize,
}

impl MockReportingPluginFactory {
    /// Factory reporting `unique_reports` and 1 KiB limits.
    pub fn new(unique_reports: bool) -> Self {
        Self {
            plugin: Arc::new(MockReportingPlugin::new()),
            info: Mutex::new(ReportingPluginInfo {
                name: "mock".to_string(),
                unique_reports,
                limits: ReportingPluginLimits {
                    max_query_length: 1024,
                    max_observation_length: 1024,
                    max_report_length: 1024,
                },
            }),
            configs: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` calls with a data source error.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Override the limits announced by subsequent plugins.
    pub fn set_limits(&self, limits: ReportingPluginLimits) {
        self.info.lock().limits = limits;
    }

    /// Configs passed to `new_reporting_plugin`, in order.
    pub fn configs(&self) -> Vec<ReportingPluginConfig> {
        self.configs.lock().clone()
    }
}

#[async_trait]
impl ReportingPluginFactory for MockReportingPluginFactory {
    async fn new_reporting_plugin(
        &self,
        config: ReportingPluginConfig,
    ) -> PluginResult<(Arc<dyn ReportingPlugin>, ReportingPluginInfo)> {
        self.configs.lock().push(config);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PluginError::DataSource("plugin backend unavailable".to_string()));
        }
        let info = self.info.lock().clone();
        Ok((self.plugin.clone() as Arc<dyn ReportingPlugin>, info))
    }
}
