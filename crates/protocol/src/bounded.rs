//! Deadlines and cancellation for calls into external collaborators.
//!
//! Every plugin hook, contract call and database operation runs through
//! [`with_timeout`]. A call that overruns only aborts itself; the state
//! machine that issued it keeps going.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Grace before a reporting plugin hook that overran its budget is reported as still running.
pub const REPORTING_PLUGIN_TIMEOUT_WARNING_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Grace before a contract transmitter call that overran its budget is reported as still running.
pub const CONTRACT_TRANSMITTER_TIMEOUT_WARNING_GRACE_PERIOD: Duration = Duration::from_millis(50);

/// Why a bounded call produced no result.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BoundedError {
    /// The deadline passed first
    #[error("{name} timed out after {limit:?}")]
    TimedOut {
        /// Operation name
        name: &'static str,
        /// The deadline that passed
        limit: Duration,
    },

    /// The enclosing task was cancelled first
    #[error("{name} was cancelled")]
    Cancelled {
        /// Operation name
        name: &'static str,
    },
}

/// Run `fut` until it completes, `limit` elapses or `cancel` fires.
pub async fn with_timeout<F>(
    name: &'static str,
    limit: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, BoundedError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BoundedError::Cancelled { name }),
        result = tokio::time::timeout(limit, fut) => {
            result.map_err(|_| BoundedError::TimedOut { name, limit })
        }
    }
}

/// Like [`with_timeout`], additionally logging a warning from a separate task if
/// the call has not returned within `limit + grace`.
///
/// The warning catches hooks that block their worker thread and therefore
/// cannot be interrupted by the deadline.
pub async fn with_timeout_and_warning<F>(
    name: &'static str,
    limit: Duration,
    grace: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, BoundedError>
where
    F: Future,
{
    let warning = SlowCallWarning::start(name, limit, grace);
    let result = with_timeout(name, limit, cancel, fut).await;
    warning.stop();
    result
}

/// Logs once if not stopped before its deadline.
#[derive(Debug)]
pub struct SlowCallWarning {
    handle: JoinHandle<()>,
}

impl SlowCallWarning {
    /// Arm a warning for `name`, firing after `limit + grace`.
    pub fn start(name: &'static str, limit: Duration, grace: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(limit + grace).await;
            warn!(
                operation = name,
                max_duration_ms = limit.as_millis() as u64,
                "Call is taking too long"
            );
        });
        Self { handle }
    }

    /// Disarm.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for SlowCallWarning {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
