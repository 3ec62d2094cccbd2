//! # OCR Node Types
//!
//! Plain data types shared by every crate of the oracle node:
//! - [`ConfigDigest`] and the [`ConfigDigestPrefix`] registry
//! - [`ContractConfig`] and the oracle identity types
//! - [`ReportTimestamp`], [`ReportContext`] and [`PendingTransmission`]
//! - Reporting plugin descriptors and network limits
//!
//! ## Example
//!
//! ```rust
//! use ocrnode_types::{ConfigDigest, ConfigDigestPrefix, ReportTimestamp};
//!
//! let digest = ConfigDigest::new([0x42; 32]).with_prefix(ConfigDigestPrefix::Evm);
//! assert_eq!(digest.prefix(), Some(ConfigDigestPrefix::Evm));
//!
//! let earlier = ReportTimestamp::new(digest, 3, 9);
//! let later = ReportTimestamp::new(digest, 4, 0);
//! assert!(earlier < later);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config_digest;
pub mod contract;
pub mod plugin;
pub mod report;

pub use config_digest::{ConfigDigest, ConfigDigestPrefix, CONFIG_DIGEST_SIZE};
pub use contract::{
    Account, ConfigDetails, ContractConfig, OffchainPublicKey, OnchainPublicKey, OracleId,
    OracleIdentity, PeerId, MAX_ORACLES,
};
pub use plugin::{
    BinaryNetworkEndpointLimits, ReportingPluginConfig, ReportingPluginInfo,
    ReportingPluginLimits, MAX_MAX_OBSERVATION_LENGTH, MAX_MAX_QUERY_LENGTH,
    MAX_MAX_REPORT_LENGTH,
};
pub use report::{
    AttributedObservation, AttributedOnchainSignature, Observation, PendingTransmission,
    PersistentState, Query, Report, ReportContext, ReportTimestamp,
};

/// Result type alias for type conversions
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when parsing or converting types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size type
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid config digest format
    #[error("invalid config digest: {0}")]
    InvalidDigest(String),
}
