//! Background writer for pending transmissions.

use crate::bounded::with_timeout;
use ocrnode_core::Database;
use ocrnode_types::{PendingTransmission, ReportTimestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Capacity of the channel feeding the persist task.
pub const PERSIST_CHANNEL_CAPACITY: usize = 16;

/// A write to the pending transmissions table.
///
/// Stores and deletes share one channel so that the delete of a fired
/// transmission always lands after its store.
#[derive(Debug, Clone)]
pub struct PersistRequest {
    /// Round the transmission belongs to
    pub ts: ReportTimestamp,
    /// What to store, or `None` to delete the entry of `ts`
    pub transmission: Option<PendingTransmission>,
}

/// Apply every request to `database` in order, each bounded by
/// `database_timeout`.
///
/// Failures are logged and dropped. Returns once the sender side is closed or
/// `cancel` fires.
pub async fn run_persist(
    database: Arc<dyn Database>,
    database_timeout: Duration,
    mut requests: mpsc::Receiver<PersistRequest>,
    cancel: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = requests.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let (name, result) = match &request.transmission {
            Some(transmission) => (
                "Database::store_pending_transmission",
                with_timeout(
                    "Database::store_pending_transmission",
                    database_timeout,
                    &cancel,
                    database.store_pending_transmission(request.ts, transmission),
                )
                .await,
            ),
            None => (
                "Database::delete_pending_transmission",
                with_timeout(
                    "Database::delete_pending_transmission",
                    database_timeout,
                    &cancel,
                    database.delete_pending_transmission(request.ts),
                )
                .await,
            ),
        };

        match result {
            Ok(Ok(())) => debug!(
                config_digest = %request.ts.config_digest,
                epoch = request.ts.epoch,
                round = request.ts.round,
                call = name,
                "Persist: done"
            ),
            Ok(Err(e)) => error!(
                error = %e,
                epoch = request.ts.epoch,
                round = request.ts.round,
                call = name,
                "Persist: error writing pending transmission"
            ),
            Err(e) => error!(
                error = %e,
                epoch = request.ts.epoch,
                round = request.ts.round,
                call = name,
                "Persist: write did not complete"
            ),
        }
    }
    debug!("Persist: exiting");
}
