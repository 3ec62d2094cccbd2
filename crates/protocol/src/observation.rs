//! Observations signed with the offchain key of their observer.

use crate::error::{VerificationError, VerificationResult};
use ocrnode_core::{KeyringResult, OffchainKeyring};
use ocrnode_crypto::verify_offchain_signature;
use ocrnode_types::{Observation, OffchainPublicKey, OracleId, ReportTimestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An observation plus the observer's signature binding it to a round and query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedObservation {
    /// Plugin-produced observation
    pub observation: Observation,
    /// Ed25519 signature over [`signed_observation_message`]
    pub signature: Vec<u8>,
}

impl SignedObservation {
    /// Sign `observation` for the round `ts` answering `query`.
    pub fn sign(
        ts: &ReportTimestamp,
        query: &[u8],
        observation: Observation,
        keyring: &dyn OffchainKeyring,
    ) -> KeyringResult<Self> {
        let msg = signed_observation_message(ts, query, &observation);
        let signature = keyring.offchain_sign(&msg)?;
        Ok(Self {
            observation,
            signature,
        })
    }

    /// Check the signature against the observer's offchain public key.
    pub fn verify(
        &self,
        ts: &ReportTimestamp,
        query: &[u8],
        public_key: &OffchainPublicKey,
    ) -> VerificationResult<()> {
        let msg = signed_observation_message(ts, query, &self.observation);
        if verify_offchain_signature(public_key, &msg, &self.signature) {
            Ok(())
        } else {
            Err(VerificationError::InvalidObservationSignature)
        }
    }
}

/// A signed observation and the oracle that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedSignedObservation {
    /// The observation
    pub signed_observation: SignedObservation,
    /// Who observed it
    pub observer: OracleId,
}

/// SHA-256 over digest, big-endian epoch, round and the length-prefixed query
/// and observation.
pub fn signed_observation_message(
    ts: &ReportTimestamp,
    query: &[u8],
    observation: &[u8],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(ts.config_digest.as_bytes());
    hasher.update(ts.epoch.to_be_bytes());
    hasher.update([ts.round]);
    hasher.update((query.len() as u64).to_be_bytes());
    hasher.update(query);
    hasher.update((observation.len() as u64).to_be_bytes());
    hasher.update(observation);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrnode_types::ConfigDigest;

    #[test]
    fn test_message_layout() {
        let ts = ReportTimestamp::new(ConfigDigest::new([1; 32]), 0x0102_0304, 5);
        let mut expected = Vec::new();
        expected.extend_from_slice(&[1; 32]);
        expected.extend_from_slice(&[1, 2, 3, 4, 5]);
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1, 0xAA]);
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 2, 0xBB, 0xCC]);

        let direct: [u8; 32] = Sha256::digest(&expected).into();
        assert_eq!(signed_observation_message(&ts, &[0xAA], &[0xBB, 0xCC]), direct);
    }

    #[test]
    fn test_length_prefix_separates_query_and_observation() {
        let ts = ReportTimestamp::new(ConfigDigest::ZERO, 1, 1);
        assert_ne!(
            signed_observation_message(&ts, b"ab", b"c"),
            signed_observation_message(&ts, b"a", b"bc")
        );
    }
}
