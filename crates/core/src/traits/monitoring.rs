//! Sink for telemetry emitted by the oracle.

/// Receives serialized telemetry records.
///
/// Must not block: the forwarding task calls it inline.
pub trait MonitoringEndpoint: Send + Sync + 'static {
    /// Forward one serialized log record.
    fn send_log(&self, log: Vec<u8>);
}
