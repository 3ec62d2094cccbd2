//! Offchain configuration, as published (encoded) in the contract config.
//!
//! Durations are signed nanosecond counts so that a malformed config with a
//! negative value is representable and rejected by the validator instead of
//! failing to decode.

use crate::error::{ConfigError, ConfigResult};
use ocrnode_types::{OffchainPublicKey, PeerId};
use serde::{Deserialize, Serialize};

/// The only offchain config version this node understands.
pub const OFFCHAIN_CONFIG_VERSION: u64 = 2;

/// Decoded (and decrypted) offchain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffchainConfig {
    /// Pacemaker timeout before a new epoch is started
    pub delta_progress_ns: i64,
    /// Interval at which new-epoch messages are resent
    pub delta_resend_ns: i64,
    /// Interval between rounds within an epoch
    pub delta_round_ns: i64,
    /// Grace period for late observations
    pub delta_grace_ns: i64,
    /// Delay between transmission stages
    pub delta_stage_ns: i64,
    /// Maximum number of rounds per epoch
    pub r_max: u8,
    /// Transmission stage sizes
    pub s: Vec<i64>,
    /// Ed25519 keys of all oracles
    #[serde(with = "hex_key_list")]
    pub offchain_public_keys: Vec<OffchainPublicKey>,
    /// Peer ids of all oracles
    pub peer_ids: Vec<PeerId>,
    /// Configuration for the reporting plugin
    #[serde(with = "hex::serde")]
    pub reporting_plugin_config: Vec<u8>,
    /// Time budget of the plugin's `query`
    pub max_duration_query_ns: i64,
    /// Time budget of the plugin's `observation`
    pub max_duration_observation_ns: i64,
    /// Time budget of the plugin's `report`
    pub max_duration_report_ns: i64,
    /// Time budget of `should_accept_finalized_report`
    pub max_duration_should_accept_finalized_report_ns: i64,
    /// Time budget of `should_transmit_accepted_report`
    pub max_duration_should_transmit_accepted_report_ns: i64,
    /// Secret shared among all oracles of the configuration
    #[serde(with = "hex::serde")]
    pub shared_secret: [u8; 16],
}

/// Turns the opaque `offchain_config` bytes of a contract config into an
/// [`OffchainConfig`], decrypting the shared secret on the way.
pub trait OffchainConfigDecoder: Send + Sync + 'static {
    /// Decode `encoded`.
    fn decode(&self, encoded: &[u8]) -> ConfigResult<OffchainConfig>;
}

/// Decoder for configs published as plaintext JSON.
///
/// Only suitable for local clusters and tests: the shared secret is readable
/// by anyone who can read the contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextOffchainConfigDecoder;

impl PlaintextOffchainConfigDecoder {
    /// Encode `config` the way [`OffchainConfigDecoder::decode`] expects it.
    pub fn encode(config: &OffchainConfig) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(config)
    }
}

impl OffchainConfigDecoder for PlaintextOffchainConfigDecoder {
    fn decode(&self, encoded: &[u8]) -> ConfigResult<OffchainConfig> {
        serde_json::from_slice(encoded).map_err(|e| ConfigError::OffchainConfigDecode(e.to_string()))
    }
}

mod hex_key_list {
    use ocrnode_types::OffchainPublicKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(keys: &[OffchainPublicKey], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(keys.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<OffchainPublicKey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| {
                let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
                OffchainPublicKey::try_from(bytes.as_slice()).map_err(|_| {
                    serde::de::Error::custom(format!(
                        "offchain public key must be 32 bytes, got {}",
                        bytes.len()
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_offchain_config() -> OffchainConfig {
        OffchainConfig {
            delta_progress_ns: 2_000_000_000,
            delta_resend_ns: 2_000_000_000,
            delta_round_ns: 1_000_000_000,
            delta_grace_ns: 500_000_000,
            delta_stage_ns: 1_000_000_000,
            r_max: 3,
            s: vec![1, 1, 2],
            offchain_public_keys: vec![[1; 32], [2; 32]],
            peer_ids: vec![PeerId::from("a"), PeerId::from("b")],
            reporting_plugin_config: vec![0xDE, 0xAD],
            max_duration_query_ns: 0,
            max_duration_observation_ns: 100_000_000,
            max_duration_report_ns: 100_000_000,
            max_duration_should_accept_finalized_report_ns: 100_000_000,
            max_duration_should_transmit_accepted_report_ns: 100_000_000,
            shared_secret: [7; 16],
        }
    }

    #[test]
    fn test_plaintext_roundtrip() {
        let config = create_test_offchain_config();
        let encoded = PlaintextOffchainConfigDecoder::encode(&config).unwrap();
        let decoded = PlaintextOffchainConfigDecoder.decode(&encoded).unwrap();
        assert_eq!(config, decoded);
    }

    #[test]
    fn test_keys_are_hex_encoded() {
        let encoded = PlaintextOffchainConfigDecoder::encode(&create_test_offchain_config()).unwrap();
        let text = String::from_utf8(encoded).unwrap();
        assert!(text.contains(&"01".repeat(32)));
        assert!(text.contains("\"dead\""));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = PlaintextOffchainConfigDecoder.decode(b"not json");
        assert!(matches!(result, Err(ConfigError::OffchainConfigDecode(_))));
    }
}
