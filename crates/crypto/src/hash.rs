//! # Hashing Utilities
//!
//! Keccak-256 is used wherever a digest must agree with on-chain code
//! (transmission order seeds, report signing, config digests).
//!
//! ## Streaming Hasher
//!
//! ```rust
//! use ocrnode_crypto::hash::Hasher;
//!
//! let mut hasher = Hasher::new();
//! hasher.update(b"hello");
//! hasher.update(b" world");
//! assert_eq!(hasher.finalize(), ocrnode_crypto::keccak256(b"hello world"));
//! ```

use sha3::{Digest, Keccak256};

/// Compute the Keccak256 hash of the input data.
#[inline]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the Keccak256 hash of multiple concatenated inputs, without
/// allocating the concatenation.
///
/// ```rust
/// use ocrnode_crypto::{keccak256, keccak256_concat};
///
/// assert_eq!(keccak256_concat(&[b"hello", b" ", b"world"]), keccak256(b"hello world"));
/// ```
#[inline]
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// A streaming Keccak256 hasher for incremental hashing.
#[derive(Clone)]
pub struct Hasher {
    inner: Keccak256,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a new Keccak256 hasher.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: Keccak256::new(),
        }
    }

    /// Feed more data into the hasher.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Feed a length-prefixed byte string: big-endian u64 length, then the bytes.
    #[inline]
    pub fn update_length_prefixed(&mut self, data: &[u8]) {
        self.inner.update((data.len() as u64).to_be_bytes());
        self.inner.update(data);
    }

    /// Consume the hasher and return the digest.
    #[inline]
    pub fn finalize(self) -> [u8; 32] {
        self.inner.finalize().into()
    }
}
