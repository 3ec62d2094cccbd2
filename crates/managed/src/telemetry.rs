//! Forwarding of telemetry to the monitoring endpoint.

use ocrnode_core::MonitoringEndpoint;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Drain `rx` into `endpoint` until the channel closes or `cancel` fires.
///
/// Without an endpoint the telemetry is dropped.
pub async fn forward_telemetry(
    endpoint: Option<Arc<dyn MonitoringEndpoint>>,
    mut rx: mpsc::Receiver<Vec<u8>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            log = rx.recv() => match log {
                Some(log) => {
                    if let Some(endpoint) = &endpoint {
                        endpoint.send_log(log);
                    }
                }
                None => break,
            }
        }
    }
    debug!("Telemetry: exiting");
}
