//! Volatile [`Database`] backend.

use crate::tables::Tables;
use async_trait::async_trait;
use ocrnode_core::{Database, DatabaseResult};
use ocrnode_types::{ConfigDigest, ContractConfig, PendingTransmission, PersistentState, ReportTimestamp};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

/// Keeps everything in memory. Contents are lost when dropped.
///
/// Counts pending-transmission writes so callers can observe whether a write
/// happened at all.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: RwLock<Tables>,
    pending_writes: AtomicUsize,
}

impl InMemoryDatabase {
    /// Empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `store_pending_transmission` calls so far.
    pub fn pending_transmission_writes(&self) -> usize {
        self.pending_writes.load(Ordering::SeqCst)
    }

    /// Number of stored pending transmissions, across all digests.
    pub fn pending_transmission_count(&self) -> usize {
        self.tables.read().pending.len()
    }

    /// Copy of all tables.
    pub fn snapshot(&self) -> Tables {
        self.tables.read().clone()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn read_state(
        &self,
        config_digest: ConfigDigest,
    ) -> DatabaseResult<Option<PersistentState>> {
        Ok(self.tables.read().states.get(&config_digest).cloned())
    }

    async fn write_state(
        &self,
        config_digest: ConfigDigest,
        state: &PersistentState,
    ) -> DatabaseResult<()> {
        self.tables
            .write()
            .states
            .insert(config_digest, state.clone());
        Ok(())
    }

    async fn read_config(&self) -> DatabaseResult<Option<ContractConfig>> {
        Ok(self.tables.read().config.clone())
    }

    async fn write_config(&self, config: &ContractConfig) -> DatabaseResult<()> {
        self.tables.write().config = Some(config.clone());
        Ok(())
    }

    async fn store_pending_transmission(
        &self,
        ts: ReportTimestamp,
        transmission: &PendingTransmission,
    ) -> DatabaseResult<()> {
        self.pending_writes.fetch_add(1, Ordering::SeqCst);
        self.tables.write().pending.insert(ts, transmission.clone());
        Ok(())
    }

    async fn pending_transmissions_with_config_digest(
        &self,
        config_digest: ConfigDigest,
    ) -> DatabaseResult<HashMap<ReportTimestamp, PendingTransmission>> {
        Ok(self.tables.read().pending_with_config_digest(config_digest))
    }

    async fn delete_pending_transmission(&self, ts: ReportTimestamp) -> DatabaseResult<()> {
        self.tables.write().pending.remove(&ts);
        Ok(())
    }

    async fn delete_pending_transmissions_older_than(&self, t: SystemTime) -> DatabaseResult<()> {
        self.tables.write().delete_pending_older_than(t);
        Ok(())
    }
}
