//! # Ed25519 Offchain Keyring
//!
//! Offchain protocol messages (observations, new-epoch messages, ...) are
//! signed with ed25519. Peers verify them against the offchain public keys
//! published in the offchain config.
//!
//! ```rust
//! use ocrnode_core::OffchainKeyring;
//! use ocrnode_crypto::offchain::{verify_offchain_signature, Ed25519OffchainKeyring};
//!
//! let keyring = Ed25519OffchainKeyring::random();
//! let sig = keyring.offchain_sign(b"observation").unwrap();
//! assert!(verify_offchain_signature(&keyring.offchain_public_key(), b"observation", &sig));
//! ```

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use ocrnode_core::{KeyringError, KeyringResult, OffchainKeyring};
use ocrnode_types::OffchainPublicKey;
use rand::rngs::OsRng;

/// Length of an ed25519 signature in bytes.
pub const OFFCHAIN_SIGNATURE_LENGTH: usize = 64;

/// Offchain keyring backed by an in-process ed25519 key.
#[derive(Clone)]
pub struct Ed25519OffchainKeyring {
    signing_key: SigningKey,
}

impl Ed25519OffchainKeyring {
    /// Generate a fresh key from the OS RNG.
    pub fn random() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a keyring from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Build a keyring from a hex-encoded seed (with or without `0x`).
    pub fn from_hex(hex_seed: &str) -> KeyringResult<Self> {
        let hex_seed = hex_seed.strip_prefix("0x").unwrap_or(hex_seed);
        let bytes = hex::decode(hex_seed).map_err(|e| KeyringError::InvalidKey(e.to_string()))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            KeyringError::InvalidKey(format!("expected 32-byte seed, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(&seed))
    }
}

impl std::fmt::Debug for Ed25519OffchainKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519OffchainKeyring")
            .field("public_key", &hex::encode(self.offchain_public_key()))
            .finish()
    }
}

impl OffchainKeyring for Ed25519OffchainKeyring {
    fn offchain_sign(&self, msg: &[u8]) -> KeyringResult<Vec<u8>> {
        Ok(self.signing_key.sign(msg).to_bytes().to_vec())
    }

    fn offchain_public_key(&self) -> OffchainPublicKey {
        self.signing_key.verifying_key().to_bytes()
    }
}

/// Check an ed25519 signature over `msg`.
///
/// Malformed keys or signatures verify as `false`.
pub fn verify_offchain_signature(
    public_key: &OffchainPublicKey,
    msg: &[u8],
    signature: &[u8],
) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(msg, &signature).is_ok()
}
