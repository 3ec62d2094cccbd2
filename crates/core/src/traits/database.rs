//! Persistence of protocol state, contract configs and pending transmissions.
//!
//! The node treats the database as best-effort: every call is bounded by a
//! timeout on the caller's side, failures are logged and never retried. A
//! backend therefore does not need to be transactional across calls.

use async_trait::async_trait;
use ocrnode_types::{
    ConfigDigest, ContractConfig, PendingTransmission, PersistentState, ReportTimestamp,
};
use std::collections::HashMap;
use std::time::SystemTime;
use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// A database I/O error occurred.
    #[error("database I/O error: {0}")]
    Io(String),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data corruption was detected.
    #[error("data corruption: {0}")]
    Corruption(String),

    /// The database has been closed.
    #[error("database closed")]
    Closed,
}

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Backend storing everything an oracle needs to resume after a crash.
///
/// Persisted layout, per config digest: one [`PersistentState`], plus a map
/// from [`ReportTimestamp`] to [`PendingTransmission`]. A single
/// [`ContractConfig`] (the latest one accepted) is stored independently of
/// digests.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// Read the protocol state stored for `config_digest`.
    ///
    /// Returns `Ok(None)` if nothing was stored yet.
    async fn read_state(&self, config_digest: ConfigDigest)
        -> DatabaseResult<Option<PersistentState>>;

    /// Overwrite the protocol state stored for `config_digest`.
    async fn write_state(
        &self,
        config_digest: ConfigDigest,
        state: &PersistentState,
    ) -> DatabaseResult<()>;

    /// Read the latest contract config accepted by this node.
    async fn read_config(&self) -> DatabaseResult<Option<ContractConfig>>;

    /// Overwrite the stored contract config.
    async fn write_config(&self, config: &ContractConfig) -> DatabaseResult<()>;

    /// Insert or replace the pending transmission for `ts`.
    async fn store_pending_transmission(
        &self,
        ts: ReportTimestamp,
        transmission: &PendingTransmission,
    ) -> DatabaseResult<()>;

    /// All pending transmissions whose timestamp carries `config_digest`.
    async fn pending_transmissions_with_config_digest(
        &self,
        config_digest: ConfigDigest,
    ) -> DatabaseResult<HashMap<ReportTimestamp, PendingTransmission>>;

    /// Delete the pending transmission for `ts`. Succeeds if none exists.
    async fn delete_pending_transmission(&self, ts: ReportTimestamp) -> DatabaseResult<()>;

    /// Delete every pending transmission scheduled before `t`, across all digests.
    async fn delete_pending_transmissions_older_than(&self, t: SystemTime) -> DatabaseResult<()>;
}
