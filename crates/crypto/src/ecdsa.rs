//! # EVM Onchain Keyring (secp256k1)
//!
//! Reports are signed the way an EVM contract checks them with `ecrecover`:
//!
//! ```text
//! sig_data  = keccak256(keccak256(report) || raw_report_context)
//! signature = r || s || v          (65 bytes, v in {0, 1})
//! signer    = keccak256(uncompressed_pubkey)[12..32]
//! ```
//!
//! The onchain "public key" of an oracle is its 20-byte signer address.
//! Verification recovers the address from the signature and compares.

use crate::keccak256;
use k256::{
    ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    SecretKey,
};
use ocrnode_core::{KeyringError, KeyringResult, OnchainKeyring};
use ocrnode_types::{OnchainPublicKey, ReportContext};
use rand::rngs::OsRng;

/// Ethereum-style 20-byte address
pub type Address = [u8; 20];

/// Length of an `r || s || v` signature.
pub const EVM_SIGNATURE_LENGTH: usize = 65;

/// Encode a report context as the three 32-byte words the contract hashes.
///
/// Word 0 is the config digest; word 1 holds the big-endian epoch in bytes
/// 27..31 and the round in byte 31; word 2 is the extra hash.
pub fn raw_report_context(report_context: &ReportContext) -> [[u8; 32]; 3] {
    let ts = &report_context.report_timestamp;
    let mut raw = [[0u8; 32]; 3];
    raw[0] = *ts.config_digest.as_fixed_bytes();
    raw[1][27..31].copy_from_slice(&ts.epoch.to_be_bytes());
    raw[1][31] = ts.round;
    raw[2] = report_context.extra_hash;
    raw
}

/// Hash that is actually signed for `report` in `report_context`.
pub fn report_sig_data(report_context: &ReportContext, report: &[u8]) -> [u8; 32] {
    let raw = raw_report_context(report_context);
    let mut buf = Vec::with_capacity(32 * 4);
    buf.extend_from_slice(&keccak256(report));
    for word in &raw {
        buf.extend_from_slice(word);
    }
    keccak256(&buf)
}

/// Derive the address of a verifying key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..32]);
    address
}

/// Recover the signer address from a 65-byte signature over `hash`.
pub fn recover_address(hash: &[u8; 32], signature: &[u8]) -> Option<Address> {
    if signature.len() != EVM_SIGNATURE_LENGTH {
        return None;
    }
    let sig = K256Signature::from_slice(&signature[..64]).ok()?;
    let v = signature[64];
    let v = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(v)?;
    let key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id).ok()?;
    Some(address_of(&key))
}

/// Onchain keyring holding a secp256k1 private key.
#[derive(Clone)]
pub struct EvmOnchainKeyring {
    inner: SigningKey,
}

impl EvmOnchainKeyring {
    /// Generate a random key using a cryptographically secure RNG.
    pub fn random() -> Self {
        let secret_key = SecretKey::random(&mut OsRng);
        Self {
            inner: SigningKey::from(secret_key),
        }
    }

    /// Create a keyring from raw private key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> KeyringResult<Self> {
        let secret_key = SecretKey::from_bytes(bytes.into())
            .map_err(|e| KeyringError::InvalidKey(e.to_string()))?;
        Ok(Self {
            inner: SigningKey::from(secret_key),
        })
    }

    /// Signer address of this key.
    pub fn address(&self) -> Address {
        address_of(self.inner.verifying_key())
    }

    fn sign_prehash(&self, hash: &[u8; 32]) -> KeyringResult<[u8; EVM_SIGNATURE_LENGTH]> {
        let (sig, recovery_id) = self
            .inner
            .sign_prehash_recoverable(hash)
            .map_err(|e| KeyringError::Signing(e.to_string()))?;

        let mut out = [0u8; EVM_SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }
}

impl std::fmt::Debug for EvmOnchainKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmOnchainKeyring")
            .field("address", &format!("0x{}", hex::encode(self.address())))
            .finish()
    }
}

impl OnchainKeyring for EvmOnchainKeyring {
    fn public_key(&self) -> OnchainPublicKey {
        self.address().to_vec()
    }

    fn sign(&self, report_context: &ReportContext, report: &[u8]) -> KeyringResult<Vec<u8>> {
        let hash = report_sig_data(report_context, report);
        Ok(self.sign_prehash(&hash)?.to_vec())
    }

    fn verify(
        &self,
        public_key: &OnchainPublicKey,
        report_context: &ReportContext,
        report: &[u8],
        signature: &[u8],
    ) -> bool {
        let hash = report_sig_data(report_context, report);
        match recover_address(&hash, signature) {
            Some(address) => address.as_slice() == public_key.as_slice(),
            None => false,
        }
    }

    fn max_signature_length(&self) -> usize {
        EVM_SIGNATURE_LENGTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrnode_types::{ConfigDigest, ReportTimestamp};

    #[test]
    fn test_raw_report_context_layout() {
        let ctx = ReportContext::new(
            ReportTimestamp::new(ConfigDigest::new([0xAA; 32]), 0x01020304, 0x05),
            [0xBB; 32],
        );
        let raw = raw_report_context(&ctx);
        assert_eq!(raw[0], [0xAA; 32]);
        assert_eq!(&raw[1][..27], &[0u8; 27]);
        assert_eq!(&raw[1][27..], &[1, 2, 3, 4, 5]);
        assert_eq!(raw[2], [0xBB; 32]);
    }

    #[test]
    fn test_known_address_derivation() {
        let key_bytes: [u8; 32] =
            hex::decode("4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")
                .unwrap()
                .try_into()
                .unwrap();
        let keyring = EvmOnchainKeyring::from_bytes(&key_bytes).unwrap();
        assert_eq!(
            hex::encode(keyring.address()),
            "2c7536e3605d9c16a7a3d7b1898e529396a65c23"
        );
    }
}
