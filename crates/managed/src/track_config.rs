//! Polls the contract for configuration changes.
//!
//! A change is only reported once it is buried under enough confirmations
//! and its digest has been recomputed offchain. While a change is waiting for
//! confirmations the tracker polls at most every
//! [`AWAITING_CONFIRMATION_POLL_INTERVAL`].

use crate::config_digest::PrefixCheckConfigDigester;
use ocrnode_config::LocalConfig;
use ocrnode_core::ContractConfigTracker;
use ocrnode_protocol::with_timeout;
use ocrnode_types::{ConfigDigest, ContractConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Poll interval cap while a change waits for confirmations.
pub const AWAITING_CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Capacity of the channel carrying new configs.
pub const CONFIG_CHANNEL_CAPACITY: usize = 5;

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No usable change
    Unchanged,
    /// A change was seen but is not confirmed yet
    AwaitingConfirmation,
    /// A confirmed and verified change
    Changed(ContractConfig),
}

/// Watches the contract for configs other than the one currently running.
pub struct ConfigTracker {
    tracker: Arc<dyn ContractConfigTracker>,
    digester: PrefixCheckConfigDigester,
    local_config: LocalConfig,
    current: ConfigDigest,
}

impl ConfigTracker {
    /// Track changes away from `current`.
    pub fn new(
        tracker: Arc<dyn ContractConfigTracker>,
        digester: PrefixCheckConfigDigester,
        local_config: LocalConfig,
        current: ConfigDigest,
    ) -> Self {
        Self {
            tracker,
            digester,
            local_config,
            current,
        }
    }

    /// Digest of the config last reported.
    pub fn current(&self) -> ConfigDigest {
        self.current
    }

    /// Check immediately, then on every notification or poll interval, and
    /// send each confirmed change to `configs` until `cancel` fires.
    #[instrument(skip_all, name = "track_config")]
    pub async fn run(mut self, configs: mpsc::Sender<ContractConfig>, cancel: CancellationToken) {
        let notify = self.tracker.notify();
        let poll_interval = self.local_config.contract_config_tracker_poll_interval();

        loop {
            let wait = match self.check(&cancel).await {
                CheckOutcome::Changed(cc) => {
                    self.current = cc.config_digest;
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        sent = configs.send(cc) => {
                            if sent.is_err() {
                                debug!("Config receiver gone");
                                break;
                            }
                        }
                    }
                    poll_interval
                }
                CheckOutcome::AwaitingConfirmation => {
                    poll_interval.min(AWAITING_CONFIRMATION_POLL_INTERVAL)
                }
                CheckOutcome::Unchanged => poll_interval,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = notified(notify.as_deref()) => debug!("Tracker notified of a config change"),
                _ = tokio::time::sleep(wait) => {}
            }
        }

        debug!("TrackConfig: exiting");
    }

    /// Fetch the latest config details and decide whether a new config can be
    /// used.
    pub async fn check(&self, cancel: &CancellationToken) -> CheckOutcome {
        let timeout = self.local_config.blockchain_timeout();

        let height = match with_timeout(
            "ContractConfigTracker::latest_block_height",
            timeout,
            cancel,
            self.tracker.latest_block_height(),
        )
        .await
        {
            Ok(Ok(height)) => height,
            Ok(Err(e)) => {
                error!(error = %e, "TrackConfig: error during latest_block_height");
                return CheckOutcome::Unchanged;
            }
            Err(e) => {
                error!(error = %e, "TrackConfig: latest_block_height did not complete");
                return CheckOutcome::Unchanged;
            }
        };

        let details = match with_timeout(
            "ContractConfigTracker::latest_config_details",
            timeout,
            cancel,
            self.tracker.latest_config_details(),
        )
        .await
        {
            Ok(Ok(details)) => details,
            Ok(Err(e)) => {
                error!(error = %e, "TrackConfig: error during latest_config_details");
                return CheckOutcome::Unchanged;
            }
            Err(e) => {
                error!(error = %e, "TrackConfig: latest_config_details did not complete");
                return CheckOutcome::Unchanged;
            }
        };

        if details.config_digest.is_zero() {
            warn!("TrackConfig: latest_config_details returned a zero config digest, ignoring");
            return CheckOutcome::Unchanged;
        }
        if details.config_digest == self.current {
            return CheckOutcome::Unchanged;
        }

        if !self.local_config.skip_contract_config_confirmations {
            let confirmations = u64::from(self.local_config.contract_config_confirmations);
            let confirmed_at = details
                .changed_in_block
                .saturating_add(confirmations)
                .saturating_sub(1);
            if height < confirmed_at {
                info!(
                    latest_block_height = height,
                    changed_in_block = details.changed_in_block,
                    confirmations,
                    "TrackConfig: awaiting confirmation of new config"
                );
                return CheckOutcome::AwaitingConfirmation;
            }
        }

        let cc = match with_timeout(
            "ContractConfigTracker::latest_config",
            self.local_config.contract_config_load_timeout(),
            cancel,
            self.tracker.latest_config(details.changed_in_block),
        )
        .await
        {
            Ok(Ok(cc)) => cc,
            Ok(Err(e)) => {
                error!(error = %e, "TrackConfig: error during latest_config");
                return CheckOutcome::AwaitingConfirmation;
            }
            Err(e) => {
                error!(error = %e, "TrackConfig: latest_config did not complete");
                return CheckOutcome::AwaitingConfirmation;
            }
        };

        if cc.config_digest != details.config_digest {
            error!(
                critical = true,
                details_digest = %details.config_digest,
                config_digest = %cc.config_digest,
                "TrackConfig: latest_config and latest_config_details disagree on the digest"
            );
            return CheckOutcome::Unchanged;
        }

        if let Err(e) = self.digester.check_contract_config(&cc) {
            error!(error = %e, config_digest = %cc.config_digest, "TrackConfig: contract config failed the digest check");
            return CheckOutcome::Unchanged;
        }

        info!(
            old_config_digest = %self.current,
            new_config_digest = %cc.config_digest,
            changed_in_block = details.changed_in_block,
            "TrackConfig: returning config"
        );
        CheckOutcome::Changed(cc)
    }
}

async fn notified(notify: Option<&Notify>) {
    match notify {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}
