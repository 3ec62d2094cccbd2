//! Non-blocking handle for emitting telemetry.
//!
//! Events are bincode-encoded before they enter the channel, so the
//! forwarding task and the monitoring endpoint only ever see bytes.

use ocrnode_types::ReportTimestamp;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, warn};

/// Capacity of the telemetry channel.
pub const TELEMETRY_CHANNEL_CAPACITY: usize = 100;

/// Telemetry produced by the transmission stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    /// Outcome of `should_accept_finalized_report`. `ok` is false when the
    /// plugin failed, in which case `result` is false too.
    ShouldAcceptFinalizedReportComputed {
        /// Round of the report
        ts: ReportTimestamp,
        /// Whether the report was accepted
        result: bool,
        /// Whether the plugin answered
        ok: bool,
    },
    /// Transmission delays of a round, as nanoseconds per oracle id.
    /// Oracles outside every stage are absent.
    ScheduleComputed {
        /// Round of the report
        ts: ReportTimestamp,
        /// When the schedule was computed
        unix_time_nanos: u64,
        /// `(oracle id, delay)` pairs in oracle id order
        delay_nanos_per_oracle: Vec<(u8, u64)>,
    },
    /// Outcome of `should_transmit_accepted_report`.
    ShouldTransmitAcceptedReportComputed {
        /// Round of the report
        ts: ReportTimestamp,
        /// Whether the report should be transmitted
        result: bool,
        /// Whether the plugin answered
        ok: bool,
    },
}

impl TelemetryEvent {
    /// Decode an event produced by [`TelemetrySender::emit`].
    pub fn decode(payload: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(payload)
    }
}

/// Nanoseconds since the unix epoch, saturating.
pub fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Sends encoded telemetry to the forwarding task, dropping it when the
/// channel is full.
#[derive(Debug, Clone)]
pub struct TelemetrySender {
    tx: mpsc::Sender<Vec<u8>>,
}

impl TelemetrySender {
    /// Sender and receiver pair with [`TELEMETRY_CHANNEL_CAPACITY`].
    pub fn channel() -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(TELEMETRY_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    /// Encode and queue `event`.
    pub fn emit(&self, event: &TelemetryEvent) {
        match bincode::serialize(event) {
            Ok(log) => self.send(log),
            Err(e) => error!(error = %e, "Failed to encode telemetry event"),
        }
    }

    /// Queue `log` without waiting.
    pub fn send(&self, log: Vec<u8>) {
        match self.tx.try_send(log) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Telemetry channel full, dropping message"),
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
