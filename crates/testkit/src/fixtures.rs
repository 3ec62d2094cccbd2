//! Keys and configurations for a cluster of test oracles.

use ocrnode_config::{
    LocalConfig, LocalIdentity, OffchainConfig, PlaintextOffchainConfigDecoder, SharedConfig,
    OFFCHAIN_CONFIG_VERSION,
};
use ocrnode_core::{OffchainConfigDigester, OffchainKeyring, OnchainKeyring};
use ocrnode_crypto::{Ed25519OffchainKeyring, EvmOnchainKeyring, KeccakConfigDigester};
use ocrnode_types::{Account, ContractConfig, OracleId, PeerId};
use std::sync::Arc;

const MS: i64 = 1_000_000;

/// Chain id used by [`TestCluster::digester`].
pub const TEST_CHAIN_ID: u64 = 1337;

/// Contract address used by [`TestCluster::digester`].
pub const TEST_CONTRACT_ADDRESS: [u8; 20] = [0xC0; 20];

/// Install a test-friendly subscriber. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// Keys and identity of one test oracle. Keys are derived from the index.
#[derive(Clone)]
pub struct TestOracle {
    /// Signs protocol messages
    pub offchain_keyring: Arc<Ed25519OffchainKeyring>,
    /// Signs reports
    pub onchain_keyring: Arc<EvmOnchainKeyring>,
    /// Identity as it appears in the config
    pub identity: LocalIdentity,
}

impl TestOracle {
    /// Oracle number `i`.
    pub fn new(i: u8) -> Self {
        let offchain_keyring = Ed25519OffchainKeyring::from_seed(&[i.wrapping_add(1); 32]);
        let mut onchain_seed = [0x5A; 32];
        onchain_seed[31] = i.wrapping_add(1);
        let onchain_keyring =
            EvmOnchainKeyring::from_bytes(&onchain_seed).expect("valid secp256k1 scalar");

        let identity = LocalIdentity {
            offchain_public_key: offchain_keyring.offchain_public_key(),
            onchain_public_key: onchain_keyring.public_key(),
            peer_id: PeerId(format!("peer-{i}")),
            transmit_account: Account(format!("0xtransmitter{i}")),
        };

        Self {
            offchain_keyring: Arc::new(offchain_keyring),
            onchain_keyring: Arc::new(onchain_keyring),
            identity,
        }
    }
}

/// Offchain config for `oracles` with round timing fast enough for tests.
pub fn create_test_offchain_config(oracles: &[TestOracle], s: Vec<i64>) -> OffchainConfig {
    OffchainConfig {
        delta_progress_ns: 2_000 * MS,
        delta_resend_ns: 2_000 * MS,
        delta_round_ns: 1_000 * MS,
        delta_grace_ns: 200 * MS,
        delta_stage_ns: 1_000 * MS,
        r_max: 5,
        s,
        offchain_public_keys: oracles
            .iter()
            .map(|o| o.identity.offchain_public_key)
            .collect(),
        peer_ids: oracles.iter().map(|o| o.identity.peer_id.clone()).collect(),
        reporting_plugin_config: Vec::new(),
        max_duration_query_ns: 100 * MS,
        max_duration_observation_ns: 100 * MS,
        max_duration_report_ns: 100 * MS,
        max_duration_should_accept_finalized_report_ns: 100 * MS,
        max_duration_should_transmit_accepted_report_ns: 100 * MS,
        shared_secret: [0x42; 16],
    }
}

/// A set of test oracles sharing one configuration.
pub struct TestCluster {
    /// The oracles, indexed by oracle id
    pub oracles: Vec<TestOracle>,
    /// Fault tolerance
    pub f: u8,
    /// Offchain part of the configuration
    pub offchain_config: OffchainConfig,
    /// Number of configs the contract has seen
    pub config_count: u64,
}

impl TestCluster {
    /// `n` oracles tolerating `f` faults, with a single stage holding everyone.
    pub fn new(n: u8, f: u8) -> Self {
        let oracles: Vec<_> = (0..n).map(TestOracle::new).collect();
        let offchain_config = create_test_offchain_config(&oracles, vec![n as i64]);
        Self {
            oracles,
            f,
            offchain_config,
            config_count: 1,
        }
    }

    /// Digester the contract configs of this cluster are stamped with.
    pub fn digester(&self) -> KeccakConfigDigester {
        KeccakConfigDigester::evm(TEST_CHAIN_ID, TEST_CONTRACT_ADDRESS)
    }

    /// The contract config as the chain would publish it, with a valid digest.
    pub fn contract_config(&self) -> ContractConfig {
        let mut cc = ContractConfig {
            config_digest: Default::default(),
            config_count: self.config_count,
            signers: self
                .oracles
                .iter()
                .map(|o| o.identity.onchain_public_key.clone())
                .collect(),
            transmitters: self
                .oracles
                .iter()
                .map(|o| o.identity.transmit_account.clone())
                .collect(),
            f: self.f,
            onchain_config: Vec::new(),
            offchain_config_version: OFFCHAIN_CONFIG_VERSION,
            offchain_config: PlaintextOffchainConfigDecoder::encode(&self.offchain_config)
                .expect("offchain config encodes"),
        };
        cc.config_digest = self
            .digester()
            .config_digest(&cc)
            .expect("digest computes");
        cc
    }

    /// The shared config as oracle `i` sees it.
    pub fn shared_config(&self, i: usize) -> (SharedConfig, OracleId) {
        SharedConfig::from_contract_config(
            &self.contract_config(),
            &PlaintextOffchainConfigDecoder,
            &LocalConfig::default(),
            &self.oracles[i].identity,
        )
        .expect("test cluster config is valid")
    }
}
