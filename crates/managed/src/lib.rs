//! # OCR Node Managed Oracle
//!
//! Keeps an oracle running across configuration changes:
//!
//! - [`ManagedOracle`]: restores the last config, tracks the contract and
//!   restarts the protocol whenever the config changes
//! - [`ConfigTracker`]: confirmation-aware polling of the config tracker
//! - [`PrefixCheckConfigDigester`]: offchain verification of config digests
//! - [`network_limits`] and [`report_quorum`]: per-config sizing
//! - pending-transmission garbage collection and telemetry forwarding
//!
//! ## Example
//!
//! ```ignore
//! let oracle = ManagedOracle::new(args);
//! let cancel = CancellationToken::new();
//! let handle = tokio::spawn(oracle.run(cancel.clone()));
//! // ...
//! cancel.cancel();
//! handle.await?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod backoff;
pub mod config_digest;
pub mod database;
pub mod error;
pub mod gc;
pub mod limits;
pub mod oracle;
pub mod telemetry;
pub mod track_config;

pub use backoff::Backoff;
pub use config_digest::PrefixCheckConfigDigester;
pub use error::{ManagedError, ManagedResult};
pub use gc::{collect_garbage, GC_INTERVAL, GC_MAX_AGE};
pub use limits::{network_limits, report_quorum, validate_plugin_limits, MessageLengths};
pub use oracle::{ManagedOracle, ManagedOracleArgs};
pub use track_config::{CheckOutcome, ConfigTracker};
