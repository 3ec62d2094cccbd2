//! Scripted protocol phases for exercising the runtime.
//!
//! The Pacemaker adopts any `NewEpoch` it receives with a higher epoch. Report
//! generation messages are recorded. Report finalization turns every locally
//! finalized report into a transmit event.

use async_trait::async_trait;
use ocrnode_protocol::{
    EventTransmit, MessageWithSender, PacemakerIo, PhaseContext, ProtocolMessage, ProtocolPhases,
    ReportFinalizationIo,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Phases driven by the test through the network and recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedPhases {
    report_generation: Mutex<Vec<MessageWithSender>>,
    finalization: Mutex<Vec<MessageWithSender>>,
    report_quorum: Mutex<Option<usize>>,
    exited: AtomicUsize,
    received: Notify,
}

impl ScriptedPhases {
    /// Fresh phases.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Report generation messages received, in order.
    pub fn report_generation_messages(&self) -> Vec<MessageWithSender> {
        self.report_generation.lock().clone()
    }

    /// Finalization messages received, in order.
    pub fn finalization_messages(&self) -> Vec<MessageWithSender> {
        self.finalization.lock().clone()
    }

    /// Quorum the runtime handed to the phases.
    pub fn report_quorum(&self) -> Option<usize> {
        *self.report_quorum.lock()
    }

    /// Number of phase tasks that have returned.
    pub fn exited(&self) -> usize {
        self.exited.load(Ordering::SeqCst)
    }

    /// Wait until any phase records a message.
    pub async fn received(&self) {
        self.received.notified().await;
    }
}

#[async_trait]
impl ProtocolPhases for ScriptedPhases {
    async fn run_pacemaker(&self, ctx: PhaseContext, mut io: PacemakerIo, cancel: CancellationToken) {
        *self.report_quorum.lock() = Some(ctx.report_quorum);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(m) = io.from_network.recv() => {
                    if let ProtocolMessage::NewEpoch { epoch } = m.msg {
                        io.epoch.send_if_modified(|current| {
                            if epoch > *current {
                                debug!(epoch, "ScriptedPhases: adopting epoch");
                                *current = epoch;
                                true
                            } else {
                                false
                            }
                        });
                    }
                }
                Some(m) = io.report_generation_from_network.recv() => {
                    self.report_generation.lock().push(m);
                    self.received.notify_one();
                }
            }
        }
        self.exited.fetch_add(1, Ordering::SeqCst);
    }

    async fn run_report_finalization(
        &self,
        _ctx: PhaseContext,
        mut io: ReportFinalizationIo,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(m) = io.from_network.recv() => {
                    self.finalization.lock().push(m);
                    self.received.notify_one();
                }
                Some(ev) = io.from_report_generation.recv() => {
                    let transmit = EventTransmit {
                        epoch: ev.epoch,
                        round: ev.round,
                        extra_hash: [0; 32],
                        report: ev.report,
                    };
                    if io.to_transmission.send(transmit).await.is_err() {
                        break;
                    }
                }
            }
        }
        self.exited.fetch_add(1, Ordering::SeqCst);
    }
}
