//! Periodic removal of stale pending transmissions.

use ocrnode_core::Database;
use ocrnode_protocol::with_timeout;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Base interval between collections.
pub const GC_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Pending transmissions older than this are collected.
pub const GC_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Delete every pending transmission older than [`GC_MAX_AGE`].
pub async fn collect_garbage(
    database: &dyn Database,
    database_timeout: Duration,
    cancel: &CancellationToken,
) {
    let Some(cutoff) = SystemTime::now().checked_sub(GC_MAX_AGE) else {
        return;
    };
    match with_timeout(
        "Database::delete_pending_transmissions_older_than",
        database_timeout,
        cancel,
        database.delete_pending_transmissions_older_than(cutoff),
    )
    .await
    {
        Ok(Ok(())) => info!("Collected stale pending transmissions"),
        Ok(Err(e)) => error!(error = %e, "Error collecting stale pending transmissions"),
        Err(e) => error!(error = %e, "Collecting stale pending transmissions did not complete"),
    }
}

/// Collect garbage every [`GC_INTERVAL`] plus up to another [`GC_INTERVAL`]
/// of jitter, until `cancel` fires.
pub async fn run_gc(database: Arc<dyn Database>, database_timeout: Duration, cancel: CancellationToken) {
    loop {
        let jitter = rand::thread_rng().gen_range(Duration::ZERO..GC_INTERVAL);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(GC_INTERVAL + jitter) => {
                collect_garbage(database.as_ref(), database_timeout, &cancel).await;
            }
        }
    }
    debug!("GC: exiting");
}
