//! # OCR Node Core Abstractions
//!
//! This crate defines the interfaces between the oracle runtime and the
//! outside world:
//!
//! - **Contract**: [`ContractConfigTracker`] and [`ContractTransmitter`]
//! - **Storage**: [`Database`] for crash recovery
//! - **Crypto**: [`OffchainKeyring`], [`OnchainKeyring`] and [`OffchainConfigDigester`]
//! - **Transport**: [`BinaryNetworkEndpoint`] and its factory
//! - **Plugin**: [`ReportingPlugin`] and its factory
//! - **Monitoring**: [`MonitoringEndpoint`]
//!
//! # Design Philosophy
//!
//! 1. **Trait-based abstractions**: every backend is a trait object, so test
//!    doubles and production implementations are swappable.
//!
//! 2. **Thread safety**: all traits require `Send + Sync`.
//!
//! 3. **Async I/O**: anything that may touch the chain, the disk or a data
//!    source is `async`; the caller bounds it with a timeout.
//!
//! # Example
//!
//! ```ignore
//! use ocrnode_core::{ContractTransmitter, Database};
//!
//! async fn forget_round<D: Database + ?Sized>(db: &D, ts: ReportTimestamp) {
//!     if let Err(e) = db.delete_pending_transmission(ts).await {
//!         tracing::warn!(error = %e, "Failed to delete pending transmission");
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod traits;

pub use traits::{
    // Contract
    ContractConfigTracker, ContractTransmitter, TrackerError, TrackerResult, TransmitError,
    TransmitResult,
    // Crypto
    KeyringError, KeyringResult, OffchainConfigDigester, OffchainKeyring, OnchainKeyring,
    // Storage
    Database, DatabaseError, DatabaseResult,
    // Monitoring
    MonitoringEndpoint,
    // Plugin
    PluginError, PluginResult, ReportingPlugin, ReportingPluginFactory,
    // Transport
    BinaryMessageWithSender, BinaryNetworkEndpoint, BinaryNetworkEndpointFactory, NetworkError,
    NetworkResult,
};
