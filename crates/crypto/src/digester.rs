//! Keccak-based offchain config digester.
//!
//! Hashes every field of a [`ContractConfig`] except its digest, length
//! prefixed, together with the chain id and contract address, then stamps
//! the digester's prefix over the first two bytes.

use crate::hash::Hasher;
use ocrnode_core::{KeyringResult, OffchainConfigDigester};
use ocrnode_types::{ConfigDigest, ConfigDigestPrefix, ContractConfig};

/// Domain separator mixed into every digest.
const DIGEST_DOMAIN: &[u8] = b"OCRNODE_CONFIG_DIGEST_V1";

/// Digester for one contract on one chain.
#[derive(Debug, Clone)]
pub struct KeccakConfigDigester {
    /// Chain the contract lives on
    pub chain_id: u64,
    /// Contract address bytes
    pub contract_address: Vec<u8>,
    /// Prefix stamped on every digest
    pub prefix: ConfigDigestPrefix,
}

impl KeccakConfigDigester {
    /// Digester for an EVM contract.
    pub fn evm(chain_id: u64, contract_address: [u8; 20]) -> Self {
        Self {
            chain_id,
            contract_address: contract_address.to_vec(),
            prefix: ConfigDigestPrefix::Evm,
        }
    }
}

impl OffchainConfigDigester for KeccakConfigDigester {
    fn config_digest(&self, config: &ContractConfig) -> KeyringResult<ConfigDigest> {
        let mut hasher = Hasher::new();
        hasher.update(DIGEST_DOMAIN);
        hasher.update(&self.chain_id.to_be_bytes());
        hasher.update_length_prefixed(&self.contract_address);
        hasher.update(&config.config_count.to_be_bytes());

        hasher.update(&(config.signers.len() as u64).to_be_bytes());
        for signer in &config.signers {
            hasher.update_length_prefixed(signer);
        }
        hasher.update(&(config.transmitters.len() as u64).to_be_bytes());
        for transmitter in &config.transmitters {
            hasher.update_length_prefixed(transmitter.0.as_bytes());
        }

        hasher.update(&[config.f]);
        hasher.update_length_prefixed(&config.onchain_config);
        hasher.update(&config.offchain_config_version.to_be_bytes());
        hasher.update_length_prefixed(&config.offchain_config);

        Ok(ConfigDigest::new(hasher.finalize()).with_prefix(self.prefix))
    }

    fn config_digest_prefix(&self) -> ConfigDigestPrefix {
        self.prefix
    }
}
