//! Contract config tracker backed by values the test sets.

use async_trait::async_trait;
use ocrnode_core::{ContractConfigTracker, TrackerError, TrackerResult};
use ocrnode_types::{ConfigDetails, ContractConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Serves whatever config was last [`set`](Self::set_config).
#[derive(Debug, Default)]
pub struct MockConfigTracker {
    latest: Mutex<Option<(ContractConfig, u64)>>,
    block_height: AtomicU64,
    notify: Option<Arc<Notify>>,
    detail_calls: AtomicUsize,
}

impl MockConfigTracker {
    /// Tracker that is polled only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that also signals changes through [`ContractConfigTracker::notify`].
    pub fn with_notify() -> Self {
        Self {
            notify: Some(Arc::new(Notify::new())),
            ..Self::default()
        }
    }

    /// Publish `config`, changed in `block`. Wakes notify listeners.
    pub fn set_config(&self, config: ContractConfig, block: u64) {
        *self.latest.lock() = Some((config, block));
        if let Some(notify) = &self.notify {
            notify.notify_one();
        }
    }

    /// Set the chain head.
    pub fn set_block_height(&self, height: u64) {
        self.block_height.store(height, Ordering::SeqCst);
    }

    /// Number of `latest_config_details` calls.
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractConfigTracker for MockConfigTracker {
    fn notify(&self) -> Option<Arc<Notify>> {
        self.notify.clone()
    }

    async fn latest_config_details(&self) -> TrackerResult<ConfigDetails> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let latest = self.latest.lock();
        match latest.as_ref() {
            Some((config, block)) => Ok(ConfigDetails {
                changed_in_block: *block,
                config_digest: config.config_digest,
            }),
            None => Ok(ConfigDetails {
                changed_in_block: 0,
                config_digest: Default::default(),
            }),
        }
    }

    async fn latest_config(&self, changed_in_block: u64) -> TrackerResult<ContractConfig> {
        let latest = self.latest.lock();
        match latest.as_ref() {
            Some((config, block)) if *block == changed_in_block => Ok(config.clone()),
            _ => Err(TrackerError::ConfigNotFound(changed_in_block)),
        }
    }

    async fn latest_block_height(&self) -> TrackerResult<u64> {
        Ok(self.block_height.load(Ordering::SeqCst))
    }
}
