//! 32-byte configuration digest with a chain-prefix registry.
//!
//! A [`ConfigDigest`] identifies one configuration of a protocol instance. The
//! first two bytes carry the big-endian encoding of the [`ConfigDigestPrefix`]
//! of the digester that produced it, which keeps digests computed for
//! different chains apart.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Size of a config digest in bytes
pub const CONFIG_DIGEST_SIZE: usize = 32;

/// Registry of digester prefixes.
///
/// Zero and `0xFFFF` are reserved so that a zero-initialized digest never
/// passes as a registered one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ConfigDigestPrefix {
    /// EVM-compatible chains
    Evm = 0x0001,
    /// Terra
    Terra = 0x0002,
    /// Solana
    Solana = 0x0003,
    /// StarkNet
    StarkNet = 0x0004,
    /// Digesters running outside of any chain (tests, local clusters)
    Offchain = 0x0005,
}

impl ConfigDigestPrefix {
    /// Parses a registered prefix from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Evm),
            0x0002 => Some(Self::Terra),
            0x0003 => Some(Self::Solana),
            0x0004 => Some(Self::StarkNet),
            0x0005 => Some(Self::Offchain),
            _ => None,
        }
    }

    /// Numeric value of the prefix.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Big-endian encoding, as found in the first two bytes of a digest.
    #[inline]
    pub const fn to_be_bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }
}

impl fmt::Display for ConfigDigestPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:04x})", self, self.as_u16())
    }
}

/// Digest of one configuration.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConfigDigest([u8; CONFIG_DIGEST_SIZE]);

impl ConfigDigest {
    /// The all-zero digest. Contracts report it before any config was set.
    pub const ZERO: Self = Self([0u8; CONFIG_DIGEST_SIZE]);

    /// Creates a digest from a 32-byte array.
    #[inline]
    pub const fn new(bytes: [u8; CONFIG_DIGEST_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a digest from a slice, failing unless it is exactly 32 bytes long.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != CONFIG_DIGEST_SIZE {
            return Err(Error::InvalidLength {
                expected: CONFIG_DIGEST_SIZE,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; CONFIG_DIGEST_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Parses a digest from hex, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != CONFIG_DIGEST_SIZE * 2 {
            return Err(Error::InvalidDigest(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }

    /// Returns the digest as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the digest as a fixed-size array.
    #[inline]
    pub const fn as_fixed_bytes(&self) -> &[u8; CONFIG_DIGEST_SIZE] {
        &self.0
    }

    /// Checks whether this is the zero digest.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    /// The raw two-byte prefix, whether or not it is registered.
    #[inline]
    pub fn raw_prefix(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    /// The registered prefix carried by this digest, if any.
    pub fn prefix(&self) -> Option<ConfigDigestPrefix> {
        ConfigDigestPrefix::from_u16(self.raw_prefix())
    }

    /// Returns a copy of this digest with the first two bytes replaced by `prefix`.
    pub fn with_prefix(mut self, prefix: ConfigDigestPrefix) -> Self {
        self.0[..2].copy_from_slice(&prefix.to_be_bytes());
        self
    }

    /// Lowercase hex without `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ConfigDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigDigest({})", hex::encode(self.0))
    }
}

impl fmt::Display for ConfigDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ConfigDigest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<[u8; CONFIG_DIGEST_SIZE]> for ConfigDigest {
    fn from(bytes: [u8; CONFIG_DIGEST_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<ConfigDigest> for [u8; CONFIG_DIGEST_SIZE] {
    fn from(digest: ConfigDigest) -> Self {
        digest.0
    }
}

impl AsRef<[u8]> for ConfigDigest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ConfigDigest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ConfigDigest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
