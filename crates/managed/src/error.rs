//! Errors of a config cycle.

use ocrnode_config::ConfigError;
use ocrnode_core::{KeyringError, NetworkError, PluginError, TransmitError};
use ocrnode_protocol::BoundedError;
use ocrnode_types::ConfigDigest;
use thiserror::Error;

/// Reasons a configuration cannot be run.
#[derive(Error, Debug)]
pub enum ManagedError {
    /// The digester stamped a different prefix than it declares
    #[error("config digest has prefix {actual:02x?}, but wanted prefix {expected:02x?}")]
    DigestPrefixMismatch {
        /// Prefix declared by the digester
        expected: [u8; 2],
        /// Prefix found in the computed digest
        actual: [u8; 2],
    },

    /// The contract's digest does not match the one computed offchain
    #[error("config digest mismatch: expected {expected} but got {actual}")]
    DigestMismatch {
        /// Recomputed digest
        expected: ConfigDigest,
        /// Digest claimed by the contract config
        actual: ConfigDigest,
    },

    /// The digester failed
    #[error("config digester: {0}")]
    Digester(#[from] KeyringError),

    /// The configuration is invalid or does not contain this node
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transmitter cannot name its account
    #[error("contract transmitter: {0}")]
    Transmitter(#[from] TransmitError),

    /// Plugin construction or startup failed
    #[error("reporting plugin: {0}")]
    Plugin(#[from] PluginError),

    /// A plugin announced a limit above the protocol maximum
    #[error("reporting plugin {name} is {value}, but at most {max} is allowed")]
    PluginLimit {
        /// Limit name
        name: &'static str,
        /// Announced value
        value: usize,
        /// Protocol maximum
        max: usize,
    },

    /// Endpoint construction or startup failed
    #[error("network endpoint: {0}")]
    Network(#[from] NetworkError),

    /// A bounded call did not complete
    #[error(transparent)]
    Bounded(#[from] BoundedError),
}

impl ManagedError {
    /// Whether trying the same configuration again may succeed.
    ///
    /// Problems with the configuration itself are permanent until the next
    /// config change; failures of collaborators may be transient.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Transmitter(_) | Self::Plugin(_) | Self::Network(_) | Self::Bounded(_)
        )
    }
}

/// Result type for config cycle operations.
pub type ManagedResult<T> = Result<T, ManagedError>;
