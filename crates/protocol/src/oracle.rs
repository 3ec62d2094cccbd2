//! The oracle runtime: routes inbound messages to the protocol phases and owns
//! their lifetimes.
//!
//! Report generation only ever sees messages of the current epoch. Messages
//! for a later epoch wait in a small per-sender buffer until the Pacemaker
//! moves there; messages for an earlier epoch are dropped.
//!
//! On cancellation the runtime stops forwarding, cancels its children and
//! waits for all of them to exit before returning.

use crate::message_buffer::{MessageBuffer, DEFAULT_BUFFER_CAPACITY};
use crate::messages::{MessageWithSender, Phase};
use crate::phases::{PacemakerIo, PhaseContext, ProtocolPhases, ReportFinalizationIo};
use crate::transmission::TransmissionScheduler;
use ocrnode_core::ContractTransmitter;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};

/// Capacity of the channels between runtime and phases.
pub const PHASE_CHANNEL_CAPACITY: usize = 16;

/// Epoch-aware routing state. Pure; the runtime does the sending.
#[derive(Debug)]
pub struct Router {
    epoch: u32,
    buffers: Vec<MessageBuffer<MessageWithSender>>,
}

impl Router {
    /// Router for `n` oracles starting at `epoch`.
    pub fn new(n: usize, epoch: u32) -> Self {
        Self {
            epoch,
            buffers: (0..n)
                .map(|_| MessageBuffer::new(DEFAULT_BUFFER_CAPACITY))
                .collect(),
        }
    }

    /// Current local epoch.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Messages buffered for `sender`.
    pub fn buffered(&self, sender: usize) -> usize {
        self.buffers.get(sender).map_or(0, MessageBuffer::len)
    }

    /// Decide what to do with an inbound message.
    ///
    /// Returns the phase and message to forward now, or `None` if the message
    /// was buffered or dropped.
    pub fn route(&mut self, m: MessageWithSender) -> Option<(Phase, MessageWithSender)> {
        let sender = m.sender.index();
        if sender >= self.buffers.len() {
            error!(
                critical = true,
                sender = %m.sender,
                n = self.buffers.len(),
                msg = m.msg.name(),
                "Dropping message from sender outside the oracle set"
            );
            return None;
        }

        let phase = m.msg.phase();
        if phase != Phase::ReportGeneration {
            return Some((phase, m));
        }

        let msg_epoch = m.msg.epoch();
        if msg_epoch < self.epoch {
            debug!(
                sender = %m.sender,
                msg = m.msg.name(),
                msg_epoch,
                epoch = self.epoch,
                "Dropping message for a past epoch"
            );
            None
        } else if msg_epoch == self.epoch {
            Some((phase, m))
        } else {
            trace!(sender = %m.sender, msg_epoch, epoch = self.epoch, "Buffering message for a future epoch");
            if let Some(evicted) = self.buffers[sender].push(m) {
                debug!(
                    sender = %evicted.sender,
                    msg = evicted.msg.name(),
                    msg_epoch = evicted.msg.epoch(),
                    "Buffer full, evicted oldest message"
                );
            }
            None
        }
    }

    /// Move to `epoch` and release the buffered messages that now belong to
    /// the current epoch, in per-sender FIFO order.
    pub fn advance_epoch(&mut self, epoch: u32) -> Vec<MessageWithSender> {
        self.epoch = epoch;
        let mut ready = Vec::new();
        for buffer in &mut self.buffers {
            while let Some(head) = buffer.peek() {
                let msg_epoch = head.msg.epoch();
                if msg_epoch > epoch {
                    break;
                }
                if let Some(m) = buffer.pop() {
                    if msg_epoch == epoch {
                        ready.push(m);
                    }
                }
            }
        }
        ready
    }
}

/// Senders from the runtime into the phases.
struct PhaseSenders {
    pacemaker: mpsc::Sender<MessageWithSender>,
    report_generation: mpsc::Sender<MessageWithSender>,
    report_finalization: mpsc::Sender<MessageWithSender>,
}

impl PhaseSenders {
    async fn forward(&self, phase: Phase, m: MessageWithSender, cancel: &CancellationToken) {
        let tx = match phase {
            Phase::Pacemaker => &self.pacemaker,
            Phase::ReportGeneration => &self.report_generation,
            Phase::ReportFinalization => &self.report_finalization,
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            result = tx.send(m) => {
                if result.is_err() {
                    debug!(?phase, "Phase has exited, dropping message");
                }
            }
        }
    }
}

/// One running instance of the protocol for one configuration.
pub struct Oracle {
    ctx: PhaseContext,
    phases: Arc<dyn ProtocolPhases>,
    transmitter: Arc<dyn ContractTransmitter>,
}

impl Oracle {
    /// Assemble an oracle from its context and collaborators.
    pub fn new(
        ctx: PhaseContext,
        phases: Arc<dyn ProtocolPhases>,
        transmitter: Arc<dyn ContractTransmitter>,
    ) -> Self {
        Self {
            ctx,
            phases,
            transmitter,
        }
    }

    /// Route `inbound` until `cancel` fires, then shut down every child and
    /// wait for it.
    #[instrument(skip_all, fields(config_digest = %self.ctx.config.config_digest, oracle_id = %self.ctx.oracle_id))]
    pub async fn run(self, mut inbound: mpsc::Receiver<MessageWithSender>, cancel: CancellationToken) {
        info!("Oracle: running");

        let (pacemaker_tx, pacemaker_rx) = mpsc::channel(PHASE_CHANNEL_CAPACITY);
        let (report_generation_tx, report_generation_rx) = mpsc::channel(PHASE_CHANNEL_CAPACITY);
        let (report_finalization_tx, report_finalization_rx) =
            mpsc::channel(PHASE_CHANNEL_CAPACITY);
        let (final_tx, final_rx) = mpsc::channel(PHASE_CHANNEL_CAPACITY);
        let (transmit_tx, transmit_rx) = mpsc::channel(PHASE_CHANNEL_CAPACITY);
        let (epoch_tx, mut epoch_rx) = watch::channel(0u32);

        // cancelled only once routing has stopped
        let child_cancel = CancellationToken::new();
        let mut children = JoinSet::new();

        {
            let phases = Arc::clone(&self.phases);
            let ctx = self.ctx.clone();
            let io = PacemakerIo {
                from_network: pacemaker_rx,
                report_generation_from_network: report_generation_rx,
                epoch: epoch_tx,
                to_report_finalization: final_tx,
            };
            let cancel = child_cancel.clone();
            children.spawn(async move { phases.run_pacemaker(ctx, io, cancel).await });
        }
        {
            let phases = Arc::clone(&self.phases);
            let ctx = self.ctx.clone();
            let io = ReportFinalizationIo {
                from_network: report_finalization_rx,
                from_report_generation: final_rx,
                to_transmission: transmit_tx,
            };
            let cancel = child_cancel.clone();
            children.spawn(async move { phases.run_report_finalization(ctx, io, cancel).await });
        }
        {
            let scheduler = TransmissionScheduler::new(
                Arc::clone(&self.ctx.config),
                self.ctx.oracle_id,
                self.ctx.local_config.clone(),
                Arc::clone(&self.ctx.plugin),
                Arc::clone(&self.transmitter),
                Arc::clone(&self.ctx.database),
                self.ctx.telemetry.clone(),
            );
            children.spawn(scheduler.run(transmit_rx, child_cancel.clone()));
        }

        let senders = PhaseSenders {
            pacemaker: pacemaker_tx,
            report_generation: report_generation_tx,
            report_finalization: report_finalization_tx,
        };
        let mut router = Router::new(self.ctx.config.n(), *epoch_rx.borrow_and_update());
        let mut epoch_open = true;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                changed = epoch_rx.changed(), if epoch_open => {
                    if changed.is_err() {
                        epoch_open = false;
                    } else {
                        let epoch = *epoch_rx.borrow_and_update();
                        debug!(epoch, "Oracle: epoch advanced");
                        for m in router.advance_epoch(epoch) {
                            senders.forward(Phase::ReportGeneration, m, &cancel).await;
                        }
                    }
                }
                Some(m) = inbound.recv() => {
                    if let Some((phase, m)) = router.route(m) {
                        senders.forward(phase, m, &cancel).await;
                    }
                }
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        debug!("Oracle: winding down");
        child_cancel.cancel();
        while let Some(result) = children.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Oracle: child task failed");
            }
        }
        info!("Oracle: exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ProtocolMessage;
    use ocrnode_types::OracleId;

    fn observe_req(epoch: u32, sender: u8) -> MessageWithSender {
        MessageWithSender {
            msg: ProtocolMessage::ObserveReq {
                epoch,
                round: 1,
                query: vec![sender],
            },
            sender: OracleId(sender),
        }
    }

    #[test]
    fn test_current_epoch_forwarded() {
        let mut router = Router::new(4, 3);
        let routed = router.route(observe_req(3, 1));
        assert!(matches!(routed, Some((Phase::ReportGeneration, _))));
    }

    #[test]
    fn test_past_epoch_dropped() {
        let mut router = Router::new(4, 3);
        assert!(router.route(observe_req(2, 1)).is_none());
        assert_eq!(router.buffered(1), 0);
    }

    #[test]
    fn test_future_epoch_buffered_then_released() {
        let mut router = Router::new(4, 3);
        assert!(router.route(observe_req(4, 1)).is_none());
        assert!(router.route(observe_req(5, 1)).is_none());
        assert!(router.route(observe_req(4, 2)).is_none());
        assert_eq!(router.buffered(1), 2);

        let released = router.advance_epoch(4);
        assert_eq!(released.len(), 2);
        assert!(released.iter().all(|m| m.msg.epoch() == 4));
        // the epoch 5 message stays
        assert_eq!(router.buffered(1), 1);
        assert_eq!(router.buffered(2), 0);
    }

    #[test]
    fn test_advance_drops_stale_entries() {
        let mut router = Router::new(2, 0);
        router.route(observe_req(1, 0));
        router.route(observe_req(2, 0));
        router.route(observe_req(4, 0));

        let released = router.advance_epoch(2);
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].msg.epoch(), 2);
        assert_eq!(router.buffered(0), 1);
    }

    #[test]
    fn test_out_of_range_sender_dropped() {
        let mut router = Router::new(4, 0);
        assert!(router.route(observe_req(0, 4)).is_none());
        assert!(router
            .route(MessageWithSender {
                msg: ProtocolMessage::NewEpoch { epoch: 1 },
                sender: OracleId(200),
            })
            .is_none());
    }

    #[test]
    fn test_non_generation_messages_bypass_epoch_check() {
        let mut router = Router::new(4, 10);
        let routed = router.route(MessageWithSender {
            msg: ProtocolMessage::NewEpoch { epoch: 1 },
            sender: OracleId(0),
        });
        assert!(matches!(routed, Some((Phase::Pacemaker, _))));
    }

    #[test]
    fn test_buffer_overflow_keeps_newest() {
        let mut router = Router::new(1, 0);
        for epoch in 1..=(DEFAULT_BUFFER_CAPACITY as u32 + 2) {
            router.route(observe_req(epoch, 0));
        }
        assert_eq!(router.buffered(0), DEFAULT_BUFFER_CAPACITY);
        // epochs 1 and 2 were evicted
        assert!(router.advance_epoch(2).is_empty());
        assert_eq!(router.advance_epoch(3).len(), 1);
    }
}
