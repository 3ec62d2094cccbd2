//! Monitoring endpoint that keeps everything it is sent.

use ocrnode_core::MonitoringEndpoint;
use parking_lot::Mutex;

/// Records every telemetry payload.
#[derive(Debug, Default)]
pub struct RecordingMonitoringEndpoint {
    logs: Mutex<Vec<Vec<u8>>>,
}

impl RecordingMonitoringEndpoint {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, in order.
    pub fn logs(&self) -> Vec<Vec<u8>> {
        self.logs.lock().clone()
    }
}

impl MonitoringEndpoint for RecordingMonitoringEndpoint {
    fn send_log(&self, log: Vec<u8>) {
        self.logs.lock().push(log);
    }
}
