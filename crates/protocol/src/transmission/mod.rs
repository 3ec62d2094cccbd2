//! Transmission of finalized reports to the contract.
//!
//! Each accepted report is scheduled at a delay derived from the shared
//! transmission order ([`delays`]), so that the oracles of a configuration
//! transmit in staggered stages instead of all at once. Scheduled reports are
//! mirrored to the database and reloaded after a restart. Plugin decisions
//! and computed schedules are reported as [`TelemetryEvent`]s.
//!
//! A scheduled report is transmitted at most once. Nothing is retried: a
//! failed transmission is covered by the other oracles' later stages and by
//! subsequent rounds.

pub mod delays;
pub mod persist;

use crate::bounded::{
    with_timeout, with_timeout_and_warning, CONTRACT_TRANSMITTER_TIMEOUT_WARNING_GRACE_PERIOD,
    REPORTING_PLUGIN_TIMEOUT_WARNING_GRACE_PERIOD,
};
use crate::messages::EventTransmit;
use crate::telemetry::{unix_nanos, TelemetryEvent, TelemetrySender};
use delays::DelaySchedule;
use ocrnode_config::{LocalConfig, SharedConfig};
use ocrnode_core::{ContractTransmitter, Database, ReportingPlugin};
use ocrnode_types::{OracleId, PendingTransmission, ReportContext, ReportTimestamp};
use persist::{run_persist, PersistRequest, PERSIST_CHANNEL_CAPACITY};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// A pending transmission in the in-memory queue.
#[derive(Debug, Clone)]
struct Scheduled {
    /// Monotonic deadline matching `transmission.time`
    deadline: Instant,
    ts: ReportTimestamp,
    transmission: PendingTransmission,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.ts.cmp(&other.ts))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Schedules and fires the transmissions of one configuration.
pub struct TransmissionScheduler {
    config: Arc<SharedConfig>,
    oracle_id: OracleId,
    local_config: LocalConfig,
    plugin: Arc<dyn ReportingPlugin>,
    transmitter: Arc<dyn ContractTransmitter>,
    database: Arc<dyn Database>,
    telemetry: TelemetrySender,

    order_key: [u8; 16],
    times: BinaryHeap<Reverse<Scheduled>>,
}

impl TransmissionScheduler {
    /// Create a scheduler. Nothing happens until [`run`](Self::run).
    pub fn new(
        config: Arc<SharedConfig>,
        oracle_id: OracleId,
        local_config: LocalConfig,
        plugin: Arc<dyn ReportingPlugin>,
        transmitter: Arc<dyn ContractTransmitter>,
        database: Arc<dyn Database>,
        telemetry: TelemetrySender,
    ) -> Self {
        let order_key = config.transmission_order_key();
        Self {
            config,
            oracle_id,
            local_config,
            plugin,
            transmitter,
            database,
            telemetry,
            order_key,
            times: BinaryHeap::new(),
        }
    }

    /// Run until `cancel` fires.
    ///
    /// Unfired transmissions stay in the database on exit; they are reloaded by
    /// the next scheduler for the same digest or removed by garbage collection.
    #[instrument(skip_all, fields(config_digest = %self.config.config_digest, oracle_id = %self.oracle_id))]
    pub async fn run(mut self, mut events: mpsc::Receiver<EventTransmit>, cancel: CancellationToken) {
        let (persist_tx, persist_rx) = mpsc::channel(PERSIST_CHANNEL_CAPACITY);
        let persist = tokio::spawn(run_persist(
            Arc::clone(&self.database),
            self.local_config.database_timeout(),
            persist_rx,
            cancel.clone(),
        ));

        self.restore_from_database(&cancel).await;

        loop {
            let next = self.times.peek().map(|Reverse(item)| item.deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                Some(ev) = events.recv() => self.event_transmit(ev, &persist_tx, &cancel).await,
                _ = sleep_until(next) => self.event_transmit_timeout(&persist_tx, &cancel).await,
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        drop(persist_tx);
        if let Err(e) = persist.await {
            error!(error = %e, "Persist task panicked");
        }
        info!("Transmission: exiting");
    }

    async fn restore_from_database(&mut self, cancel: &CancellationToken) {
        let config_digest = self.config.config_digest;
        let result = with_timeout(
            "Database::pending_transmissions_with_config_digest",
            self.local_config.database_timeout(),
            cancel,
            self.database
                .pending_transmissions_with_config_digest(config_digest),
        )
        .await;

        let pending = match result {
            Ok(Ok(pending)) => pending,
            Ok(Err(e)) => {
                error!(error = %e, "Transmission: error fetching pending transmissions from database");
                return;
            }
            Err(e) => {
                error!(error = %e, "Transmission: fetching pending transmissions did not complete");
                return;
            }
        };

        let now_system = SystemTime::now();
        let now = Instant::now();
        for (ts, transmission) in pending {
            if ts.config_digest != config_digest {
                continue;
            }
            // expired entries are left for garbage collection
            match transmission.time.duration_since(now_system) {
                Ok(remaining) if !remaining.is_zero() => {
                    self.times.push(Reverse(Scheduled {
                        deadline: now + remaining,
                        ts,
                        transmission,
                    }));
                }
                _ => {}
            }
        }

        info!(restored = self.times.len(), "Transmission: restored pending transmissions");
    }

    async fn event_transmit(
        &mut self,
        ev: EventTransmit,
        persist_tx: &mpsc::Sender<PersistRequest>,
        cancel: &CancellationToken,
    ) {
        let ts = ReportTimestamp::new(self.config.config_digest, ev.epoch, ev.round);
        debug!(epoch = ev.epoch, round = ev.round, "Received transmit event");

        let should_accept = with_timeout_and_warning(
            "ReportingPlugin::should_accept_finalized_report",
            self.config.max_duration_should_accept_finalized_report,
            REPORTING_PLUGIN_TIMEOUT_WARNING_GRACE_PERIOD,
            cancel,
            self.plugin
                .should_accept_finalized_report(ts, &ev.report.report),
        )
        .await;

        let (result, ok) = match should_accept {
            Ok(Ok(accept)) => {
                if !accept {
                    debug!(epoch = ev.epoch, round = ev.round, "ReportingPlugin::should_accept_finalized_report returned false");
                }
                (accept, true)
            }
            Ok(Err(e)) => {
                error!(error = %e, epoch = ev.epoch, round = ev.round, "Error in ReportingPlugin::should_accept_finalized_report");
                (false, false)
            }
            Err(e) => {
                error!(error = %e, epoch = ev.epoch, round = ev.round, "ReportingPlugin::should_accept_finalized_report did not complete");
                (false, false)
            }
        };
        self.telemetry
            .emit(&TelemetryEvent::ShouldAcceptFinalizedReportComputed { ts, result, ok });
        if !result {
            return;
        }

        let now = SystemTime::now();
        let schedule = DelaySchedule {
            order_key: &self.order_key,
            config_digest: &self.config.config_digest,
            n: self.config.n(),
            s: &self.config.s,
            delta_stage: self.config.delta_stage,
        };
        let delays = schedule.transmit_delays(ev.epoch, ev.round);
        self.telemetry.emit(&TelemetryEvent::ScheduleComputed {
            ts,
            unix_time_nanos: unix_nanos(now),
            delay_nanos_per_oracle: delays
                .iter()
                .enumerate()
                .filter_map(|(i, delay)| {
                    delay.map(|d| (i as u8, u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)))
                })
                .collect(),
        });
        let Some(delay) = delays.get(self.oracle_id.index()).copied().flatten() else {
            debug!(epoch = ev.epoch, round = ev.round, "Not assigned to a transmission stage");
            return;
        };

        let transmission = PendingTransmission {
            time: now + delay,
            extra_hash: ev.extra_hash,
            report: ev.report.report,
            attributed_signatures: ev.report.attributed_signatures,
        };

        match persist_tx.try_send(PersistRequest {
            ts,
            transmission: Some(transmission.clone()),
        }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(epoch = ev.epoch, round = ev.round, "Persist channel full, dropping write");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(epoch = ev.epoch, round = ev.round, "Persist task gone, dropping write");
            }
        }

        debug!(
            epoch = ev.epoch,
            round = ev.round,
            delay_ms = delay.as_millis() as u64,
            "Scheduled transmission"
        );
        self.times.push(Reverse(Scheduled {
            deadline: Instant::now() + delay,
            ts,
            transmission,
        }));
    }

    async fn event_transmit_timeout(
        &mut self,
        persist_tx: &mpsc::Sender<PersistRequest>,
        cancel: &CancellationToken,
    ) {
        let Some(Reverse(item)) = self.times.pop() else {
            return;
        };
        let Scheduled {
            ts, transmission, ..
        } = item;

        match persist_tx.try_send(PersistRequest {
            ts,
            transmission: None,
        }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(epoch = ts.epoch, round = ts.round, "Persist channel full, dropping delete");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(epoch = ts.epoch, round = ts.round, "Persist task gone, dropping delete");
            }
        }

        let should_transmit = with_timeout_and_warning(
            "ReportingPlugin::should_transmit_accepted_report",
            self.config.max_duration_should_transmit_accepted_report,
            REPORTING_PLUGIN_TIMEOUT_WARNING_GRACE_PERIOD,
            cancel,
            self.plugin
                .should_transmit_accepted_report(ts, &transmission.report),
        )
        .await;

        let (result, ok) = match should_transmit {
            Ok(Ok(transmit)) => {
                if !transmit {
                    info!(epoch = ts.epoch, round = ts.round, "ReportingPlugin::should_transmit_accepted_report returned false");
                }
                (transmit, true)
            }
            Ok(Err(e)) => {
                error!(error = %e, epoch = ts.epoch, round = ts.round, "Error in ReportingPlugin::should_transmit_accepted_report");
                (false, false)
            }
            Err(e) => {
                error!(error = %e, epoch = ts.epoch, round = ts.round, "ReportingPlugin::should_transmit_accepted_report did not complete");
                (false, false)
            }
        };
        self.telemetry
            .emit(&TelemetryEvent::ShouldTransmitAcceptedReportComputed { ts, result, ok });
        if !result {
            return;
        }

        info!(epoch = ts.epoch, round = ts.round, "Transmitting");

        let transmitted = with_timeout_and_warning(
            "ContractTransmitter::transmit",
            self.local_config.contract_transmitter_transmit_timeout(),
            CONTRACT_TRANSMITTER_TIMEOUT_WARNING_GRACE_PERIOD,
            cancel,
            self.transmitter.transmit(
                ReportContext::new(ts, transmission.extra_hash),
                &transmission.report,
                &transmission.attributed_signatures,
            ),
        )
        .await;

        match transmitted {
            Ok(Ok(())) => info!(epoch = ts.epoch, round = ts.round, "Successfully transmitted report on-chain"),
            Ok(Err(e)) => error!(error = %e, epoch = ts.epoch, round = ts.round, "Error transmitting report on-chain"),
            Err(e) => error!(error = %e, epoch = ts.epoch, round = ts.round, "Transmit did not complete"),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Convenience for callers that only need the delay of one oracle.
pub fn transmit_delay(
    config: &SharedConfig,
    epoch: u32,
    round: u8,
    oracle_id: OracleId,
) -> Option<Duration> {
    DelaySchedule {
        order_key: &config.transmission_order_key(),
        config_digest: &config.config_digest,
        n: config.n(),
        s: &config.s,
        delta_stage: config.delta_stage,
    }
    .transmit_delay(epoch, round, oracle_id)
}
