//! Tests for contract config validation

use ocrnode_config::{
    ConfigError, OffchainConfig, PublicConfig, OFFCHAIN_CONFIG_VERSION,
    RESOURCE_EXHAUSTION_SAFE_INTERVAL,
};
use ocrnode_types::{Account, ConfigDigest, ContractConfig, PeerId};
use std::time::Duration;

const MS: i64 = 1_000_000;

fn create_test_offchain_config(n: usize) -> OffchainConfig {
    OffchainConfig {
        delta_progress_ns: 2_000 * MS,
        delta_resend_ns: 2_000 * MS,
        delta_round_ns: 1_000 * MS,
        delta_grace_ns: 200 * MS,
        delta_stage_ns: 500 * MS,
        r_max: 5,
        s: vec![1; n],
        offchain_public_keys: (0..n).map(|i| [i as u8 + 1; 32]).collect(),
        peer_ids: (0..n).map(|i| PeerId(format!("peer-{i}"))).collect(),
        reporting_plugin_config: vec![1, 2, 3],
        max_duration_query_ns: 100 * MS,
        max_duration_observation_ns: 100 * MS,
        max_duration_report_ns: 100 * MS,
        max_duration_should_accept_finalized_report_ns: 100 * MS,
        max_duration_should_transmit_accepted_report_ns: 100 * MS,
        shared_secret: [9; 16],
    }
}

fn create_test_contract_config(n: usize, f: u8) -> ContractConfig {
    ContractConfig {
        config_digest: ConfigDigest::new([0xAB; 32]),
        config_count: 1,
        signers: (0..n).map(|i| vec![i as u8 + 1; 20]).collect(),
        transmitters: (0..n).map(|i| Account(format!("0xtransmitter{i}"))).collect(),
        f,
        onchain_config: vec![0xCC],
        offchain_config_version: OFFCHAIN_CONFIG_VERSION,
        offchain_config: Vec::new(),
    }
}

#[test]
fn test_valid_config() {
    let cc = create_test_contract_config(4, 1);
    let oc = create_test_offchain_config(4);

    let config = PublicConfig::validate(&cc, &oc, false).unwrap();
    assert_eq!(config.n(), 4);
    assert_eq!(config.f, 1);
    assert_eq!(config.delta_progress, Duration::from_secs(2));
    assert_eq!(config.s, vec![1, 1, 1, 1]);
    assert_eq!(config.config_digest, cc.config_digest);
    assert_eq!(config.onchain_config, vec![0xCC]);
    assert_eq!(config.oracle_identities[2].peer_id, PeerId::from("peer-2"));
    assert_eq!(config.oracle_identities[2].onchain_public_key, vec![3; 20]);
    assert_eq!(
        config.oracle_identities[2].transmit_account,
        Account::from("0xtransmitter2")
    );
}

#[test]
fn test_transmitters_length_mismatch() {
    let mut cc = create_test_contract_config(4, 1);
    cc.transmitters.pop();
    let oc = create_test_offchain_config(4);

    let err = PublicConfig::validate(&cc, &oc, false).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::IdentityListLength {
            name: "transmitters",
            length: 3,
            expected: 4
        }
    ));
    assert!(err
        .to_string()
        .contains("transmitters list must have same length as onchain signers list"));
}

#[test]
fn test_unsupported_version() {
    let mut cc = create_test_contract_config(4, 1);
    cc.offchain_config_version = 1;
    let result = PublicConfig::validate(&cc, &create_test_offchain_config(4), false);
    assert!(matches!(
        result,
        Err(ConfigError::UnsupportedOffchainConfigVersion { got: 1, expected: 2 })
    ));
}

#[test]
fn test_duplicate_signer() {
    let mut cc = create_test_contract_config(4, 1);
    cc.signers[3] = cc.signers[1].clone();
    let result = PublicConfig::validate(&cc, &create_test_offchain_config(4), false);
    assert!(matches!(
        result,
        Err(ConfigError::DuplicateSigner {
            first: 1,
            second: 3,
            ..
        })
    ));
}

#[test]
fn test_duplicate_peer_id() {
    let cc = create_test_contract_config(4, 1);
    let mut oc = create_test_offchain_config(4);
    oc.peer_ids[0] = oc.peer_ids[3].clone();
    let result = PublicConfig::validate(&cc, &oc, false);
    assert!(matches!(result, Err(ConfigError::DuplicatePeerId(_))));
}

#[test]
fn test_duplicate_transmitter() {
    let mut cc = create_test_contract_config(4, 1);
    cc.transmitters[0] = cc.transmitters[2].clone();
    let result = PublicConfig::validate(&cc, &create_test_offchain_config(4), false);
    assert!(matches!(result, Err(ConfigError::DuplicateTransmitter(_))));
}

#[test]
fn test_fault_tolerance() {
    // 3f < n
    let cc = create_test_contract_config(3, 1);
    let result = PublicConfig::validate(&cc, &create_test_offchain_config(3), false);
    assert!(matches!(
        result,
        Err(ConfigError::InvalidFaultTolerance { f: 1, n: 3 })
    ));

    let cc = create_test_contract_config(7, 2);
    assert!(PublicConfig::validate(&cc, &create_test_offchain_config(7), false).is_ok());
}

#[test]
fn test_too_many_oracles() {
    let cc = create_test_contract_config(32, 1);
    let mut oc = create_test_offchain_config(32);
    oc.s = vec![1];
    let result = PublicConfig::validate(&cc, &oc, false);
    assert!(matches!(
        result,
        Err(ConfigError::TooManyOracles { n: 32, max: 31 })
    ));
}

#[test]
fn test_negative_duration() {
    let cc = create_test_contract_config(4, 1);
    let mut oc = create_test_offchain_config(4);
    oc.delta_grace_ns = -1;
    let result = PublicConfig::validate(&cc, &oc, false);
    assert!(matches!(
        result,
        Err(ConfigError::NegativeDuration {
            name: "delta_grace",
            value_ns: -1
        })
    ));
}

#[test]
fn test_delta_round_must_be_below_progress() {
    let cc = create_test_contract_config(4, 1);
    let mut oc = create_test_offchain_config(4);
    oc.delta_round_ns = oc.delta_progress_ns;
    let result = PublicConfig::validate(&cc, &oc, false);
    assert!(matches!(
        result,
        Err(ConfigError::DeltaRoundNotBelowProgress { .. })
    ));
}

#[test]
fn test_max_durations_must_fit_progress() {
    let cc = create_test_contract_config(4, 1);
    let mut oc = create_test_offchain_config(4);
    oc.max_duration_report_ns = 1_800 * MS;
    let result = PublicConfig::validate(&cc, &oc, false);
    assert!(matches!(
        result,
        Err(ConfigError::MaxDurationsExceedProgress { .. })
    ));
}

#[test]
fn test_r_max_bounds() {
    let cc = create_test_contract_config(4, 1);
    for r_max in [0u8, 255] {
        let mut oc = create_test_offchain_config(4);
        oc.r_max = r_max;
        let result = PublicConfig::validate(&cc, &oc, false);
        assert!(matches!(result, Err(ConfigError::InvalidRMax(v)) if v == r_max));
    }
}

#[test]
fn test_stage_sizes() {
    let cc = create_test_contract_config(4, 1);

    let mut oc = create_test_offchain_config(4);
    oc.s = vec![1, 32];
    let result = PublicConfig::validate(&cc, &oc, false);
    assert!(matches!(
        result,
        Err(ConfigError::InvalidStageSize {
            index: 1,
            value: 32,
            ..
        })
    ));

    let mut oc = create_test_offchain_config(4);
    oc.s = vec![-1];
    assert!(matches!(
        PublicConfig::validate(&cc, &oc, false),
        Err(ConfigError::InvalidStageSize { index: 0, .. })
    ));

    let mut oc = create_test_offchain_config(4);
    oc.s = vec![0; 1000];
    assert!(matches!(
        PublicConfig::validate(&cc, &oc, false),
        Err(ConfigError::TooManyStages(1000))
    ));
}

#[test]
fn test_resource_exhaustion_checks() {
    let cc = create_test_contract_config(4, 1);
    let mut oc = create_test_offchain_config(4);
    oc.delta_resend_ns = 10 * MS;

    let result = PublicConfig::validate(&cc, &oc, false);
    assert!(matches!(
        result,
        Err(ConfigError::BelowSafeInterval {
            name: "delta_resend",
            min,
            ..
        }) if min == RESOURCE_EXHAUSTION_SAFE_INTERVAL
    ));

    // development mode skips the check
    let config = PublicConfig::validate(&cc, &oc, true).unwrap();
    assert_eq!(config.delta_resend, Duration::from_millis(10));
}
