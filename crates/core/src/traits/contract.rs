//! Access to the on-chain contract: config tracking and report transmission.

use async_trait::async_trait;
use ocrnode_types::{
    Account, AttributedOnchainSignature, ConfigDetails, ConfigDigest, ContractConfig,
    ReportContext,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;

/// Errors returned by the contract config tracker.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The chain RPC could not be reached or returned an error.
    #[error("chain RPC error: {0}")]
    Rpc(String),

    /// No config was found at the requested block.
    #[error("no config found in block {0}")]
    ConfigNotFound(u64),

    /// A config event could not be decoded.
    #[error("failed to decode config: {0}")]
    Decode(String),
}

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors returned by the contract transmitter.
#[derive(Error, Debug)]
pub enum TransmitError {
    /// The transaction was rejected by the chain or its RPC.
    #[error("transmission rejected: {0}")]
    Rejected(String),

    /// The chain RPC could not be reached or returned an error.
    #[error("chain RPC error: {0}")]
    Rpc(String),

    /// The transmitting account is unknown or locked.
    #[error("account unavailable: {0}")]
    Account(String),
}

/// Result type for transmitter operations.
pub type TransmitResult<T> = Result<T, TransmitError>;

/// Watches the contract for configuration changes.
///
/// All methods must be safe to call concurrently.
#[async_trait]
pub trait ContractConfigTracker: Send + Sync + 'static {
    /// Optional wakeup handle, notified when a config change might have
    /// happened. Trackers without push support return `None` and are polled.
    fn notify(&self) -> Option<Arc<Notify>>;

    /// Block and digest of the latest config set on the contract.
    async fn latest_config_details(&self) -> TrackerResult<ConfigDetails>;

    /// Full config that was set in `changed_in_block`.
    async fn latest_config(&self, changed_in_block: u64) -> TrackerResult<ContractConfig>;

    /// Height of the latest block the tracker knows of.
    async fn latest_block_height(&self) -> TrackerResult<u64>;
}

/// Sends finalized reports to the contract.
#[async_trait]
pub trait ContractTransmitter: Send + Sync + 'static {
    /// Submit `report` with its quorum of signatures.
    ///
    /// Called at most once per round by the transmission scheduler; a failure
    /// is logged and never retried.
    async fn transmit(
        &self,
        report_context: ReportContext,
        report: &[u8],
        signatures: &[AttributedOnchainSignature],
    ) -> TransmitResult<()>;

    /// Digest and epoch of the latest report accepted by the contract.
    async fn latest_config_digest_and_epoch(&self) -> TransmitResult<(ConfigDigest, u32)>;

    /// Account transactions are sent from.
    fn from_account(&self) -> TransmitResult<Account>;
}
