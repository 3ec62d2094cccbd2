//! JSON-file [`Database`] backend.
//!
//! The whole database is one JSON document. Every write rewrites it through a
//! temporary file and a rename, so a crash leaves either the old or the new
//! contents on disk.

use crate::tables::{Snapshot, Tables};
use async_trait::async_trait;
use ocrnode_core::{Database, DatabaseError, DatabaseResult};
use ocrnode_types::{ConfigDigest, ContractConfig, PendingTransmission, PersistentState, ReportTimestamp};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Database persisted to a single JSON file.
#[derive(Debug)]
pub struct FileDatabase {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl FileDatabase {
    /// Open the database at `path`, creating an empty one if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)
                    .map_err(|e| DatabaseError::Corruption(format!("{}: {e}", path.display())))?;
                Tables::from(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
            Err(e) => return Err(DatabaseError::Io(e.to_string())),
        };

        info!(
            path = %path.display(),
            pending = tables.pending.len(),
            "Opened file database"
        );
        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, tables: &Tables) -> DatabaseResult<()> {
        let bytes = serde_json::to_vec(&Snapshot::from(tables))
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| DatabaseError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| DatabaseError::Io(e.to_string()))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Flushed file database");
        Ok(())
    }

    /// Apply `f` and persist the result. On a failed write the change is rolled back.
    async fn update<F>(&self, f: F) -> DatabaseResult<()>
    where
        F: FnOnce(&mut Tables),
    {
        let mut tables = self.tables.lock().await;
        let mut next = tables.clone();
        f(&mut next);
        self.flush(&next).await?;
        *tables = next;
        Ok(())
    }
}

#[async_trait]
impl Database for FileDatabase {
    async fn read_state(
        &self,
        config_digest: ConfigDigest,
    ) -> DatabaseResult<Option<PersistentState>> {
        Ok(self.tables.lock().await.states.get(&config_digest).cloned())
    }

    async fn write_state(
        &self,
        config_digest: ConfigDigest,
        state: &PersistentState,
    ) -> DatabaseResult<()> {
        self.update(|tables| {
            tables.states.insert(config_digest, state.clone());
        })
        .await
    }

    async fn read_config(&self) -> DatabaseResult<Option<ContractConfig>> {
        Ok(self.tables.lock().await.config.clone())
    }

    async fn write_config(&self, config: &ContractConfig) -> DatabaseResult<()> {
        self.update(|tables| tables.config = Some(config.clone()))
            .await
    }

    async fn store_pending_transmission(
        &self,
        ts: ReportTimestamp,
        transmission: &PendingTransmission,
    ) -> DatabaseResult<()> {
        self.update(|tables| {
            tables.pending.insert(ts, transmission.clone());
        })
        .await
    }

    async fn pending_transmissions_with_config_digest(
        &self,
        config_digest: ConfigDigest,
    ) -> DatabaseResult<HashMap<ReportTimestamp, PendingTransmission>> {
        Ok(self
            .tables
            .lock()
            .await
            .pending_with_config_digest(config_digest))
    }

    async fn delete_pending_transmission(&self, ts: ReportTimestamp) -> DatabaseResult<()> {
        self.update(|tables| {
            tables.pending.remove(&ts);
        })
        .await
    }

    async fn delete_pending_transmissions_older_than(&self, t: SystemTime) -> DatabaseResult<()> {
        self.update(|tables| {
            tables.delete_pending_older_than(t);
        })
        .await
    }
}
