//! Signing services and the offchain config digester.
//!
//! Concrete primitives live elsewhere; the runtime only sees these traits.

use ocrnode_types::{
    ConfigDigest, ConfigDigestPrefix, ContractConfig, OffchainPublicKey, OnchainPublicKey,
    ReportContext,
};
use thiserror::Error;

/// Errors returned by keyrings and digesters.
#[derive(Error, Debug)]
pub enum KeyringError {
    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A key could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The config digest could not be computed.
    #[error("config digest computation failed: {0}")]
    Digest(String),
}

/// Result type for keyring operations.
pub type KeyringResult<T> = Result<T, KeyringError>;

/// Holds the ed25519 key used for offchain protocol messages.
pub trait OffchainKeyring: Send + Sync + 'static {
    /// Sign `msg` with the offchain private key. Returns a 64-byte signature.
    fn offchain_sign(&self, msg: &[u8]) -> KeyringResult<Vec<u8>>;

    /// The offchain public key.
    fn offchain_public_key(&self) -> OffchainPublicKey;
}

/// Holds the chain-specific key used to sign reports for the contract.
pub trait OnchainKeyring: Send + Sync + 'static {
    /// Public key (or address) as listed in `ContractConfig::signers`.
    fn public_key(&self) -> OnchainPublicKey;

    /// Sign `report` in `report_context`.
    fn sign(&self, report_context: &ReportContext, report: &[u8]) -> KeyringResult<Vec<u8>>;

    /// Verify a signature produced by the holder of `public_key`.
    fn verify(
        &self,
        public_key: &OnchainPublicKey,
        report_context: &ReportContext,
        report: &[u8],
        signature: &[u8],
    ) -> bool;

    /// Length in bytes of the longest signature `sign` can produce.
    fn max_signature_length(&self) -> usize;
}

/// Computes config digests offchain, the same way the contract does.
///
/// Implementations must be deterministic and thread-safe.
pub trait OffchainConfigDigester: Send + Sync + 'static {
    /// Digest of `config`. The first two bytes must be the big-endian encoding
    /// of [`Self::config_digest_prefix`].
    fn config_digest(&self, config: &ContractConfig) -> KeyringResult<ConfigDigest>;

    /// Constant prefix this digester stamps on its digests.
    fn config_digest_prefix(&self) -> ConfigDigestPrefix;
}
