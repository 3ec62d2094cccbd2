//! Identities and the configuration as stored by the on-chain contract.

use crate::ConfigDigest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of oracles a single configuration may contain.
pub const MAX_ORACLES: usize = 31;

/// Index of an oracle within a configuration.
///
/// Stable for the lifetime of one configuration; equals the oracle's position
/// in the signer and transmitter lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OracleId(pub u8);

impl OracleId {
    /// The index as `usize`, for indexing per-oracle tables.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OracleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for OracleId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

/// Identifier of a node on the peer-to-peer network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Chain account an oracle transmits reports from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(pub String);

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Ed25519 public key used to verify offchain protocol messages.
pub type OffchainPublicKey = [u8; 32];

/// Chain-specific public key (or address) used to verify report signatures.
pub type OnchainPublicKey = Vec<u8>;

/// Configuration as published by the contract.
///
/// `offchain_config` is opaque at this layer: it is decoded, and possibly
/// decrypted, by the config validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Digest identifying this configuration
    pub config_digest: ConfigDigest,
    /// Number of configurations set on the contract so far, including this one
    pub config_count: u64,
    /// Onchain public keys, indexed by oracle id
    pub signers: Vec<OnchainPublicKey>,
    /// Transmit accounts, indexed by oracle id
    pub transmitters: Vec<Account>,
    /// Maximum number of faulty oracles
    pub f: u8,
    /// Configuration consumed by the contract and the reporting plugin
    pub onchain_config: Vec<u8>,
    /// Version tag of `offchain_config`
    pub offchain_config_version: u64,
    /// Encoded offchain configuration
    pub offchain_config: Vec<u8>,
}

/// Result of a config-details lookup on the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDetails {
    /// Block in which the latest configuration was set
    pub changed_in_block: u64,
    /// Digest of the latest configuration
    pub config_digest: ConfigDigest,
}

/// One row of the identity table, zipped from the on- and offchain lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleIdentity {
    /// Ed25519 key for offchain messages
    pub offchain_public_key: OffchainPublicKey,
    /// Key (or address) that signs reports for the contract
    pub onchain_public_key: OnchainPublicKey,
    /// Network identity
    pub peer_id: PeerId,
    /// Account this oracle transmits from
    pub transmit_account: Account,
}
