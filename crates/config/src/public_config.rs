//! Validation of a contract configuration into a [`PublicConfig`].
//!
//! The checks encode the parameter bounds the BFT assumptions of the protocol
//! depend on. They run in a fixed order and the first violation is returned,
//! naming the offending parameter. No I/O happens here.

use crate::error::{ConfigError, ConfigResult};
use crate::offchain::{OffchainConfig, OFFCHAIN_CONFIG_VERSION};
use ocrnode_types::{ConfigDigest, ContractConfig, OracleIdentity, MAX_ORACLES};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Minimum for delta_progress and delta_resend outside development mode.
pub const RESOURCE_EXHAUSTION_SAFE_INTERVAL: Duration = Duration::from_millis(200);

/// Validated configuration shared by all oracles of one config digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicConfig {
    /// Pacemaker timeout before a new epoch is started
    pub delta_progress: Duration,
    /// Interval at which new-epoch messages are resent
    pub delta_resend: Duration,
    /// Interval between rounds within an epoch
    pub delta_round: Duration,
    /// Grace period for late observations
    pub delta_grace: Duration,
    /// Delay between transmission stages
    pub delta_stage: Duration,
    /// Maximum number of rounds per epoch
    pub r_max: u8,
    /// Transmission stage sizes
    pub s: Vec<usize>,
    /// One identity per oracle, indexed by oracle id
    pub oracle_identities: Vec<OracleIdentity>,
    /// Configuration for the reporting plugin
    pub reporting_plugin_config: Vec<u8>,
    /// Time budget of the plugin's `query`
    pub max_duration_query: Duration,
    /// Time budget of the plugin's `observation`
    pub max_duration_observation: Duration,
    /// Time budget of the plugin's `report`
    pub max_duration_report: Duration,
    /// Time budget of `should_accept_finalized_report`
    pub max_duration_should_accept_finalized_report: Duration,
    /// Time budget of `should_transmit_accepted_report`
    pub max_duration_should_transmit_accepted_report: Duration,
    /// Maximum number of faulty oracles
    pub f: usize,
    /// Configuration consumed by the contract and the plugin
    pub onchain_config: Vec<u8>,
    /// Digest of this configuration
    pub config_digest: ConfigDigest,
}

impl PublicConfig {
    /// Number of oracles.
    #[inline]
    pub fn n(&self) -> usize {
        self.oracle_identities.len()
    }

    /// Validate `contract_config` together with its decoded offchain part.
    ///
    /// With `skip_resource_checks` (development mode only) the minimum
    /// intervals guarding against resource exhaustion are not enforced.
    pub fn validate(
        contract_config: &ContractConfig,
        offchain_config: &OffchainConfig,
        skip_resource_checks: bool,
    ) -> ConfigResult<Self> {
        if contract_config.offchain_config_version != OFFCHAIN_CONFIG_VERSION {
            return Err(ConfigError::UnsupportedOffchainConfigVersion {
                got: contract_config.offchain_config_version,
                expected: OFFCHAIN_CONFIG_VERSION,
            });
        }

        check_identity_lists_have_no_duplicates(contract_config, offchain_config)?;
        check_identity_lists_have_the_same_length(contract_config, offchain_config)?;

        let oracle_identities = contract_config
            .signers
            .iter()
            .zip(&contract_config.transmitters)
            .zip(offchain_config.offchain_public_keys.iter().zip(&offchain_config.peer_ids))
            .map(|((signer, transmitter), (offchain_key, peer_id))| OracleIdentity {
                offchain_public_key: *offchain_key,
                onchain_public_key: signer.clone(),
                peer_id: peer_id.clone(),
                transmit_account: transmitter.clone(),
            })
            .collect();

        let config = check_parameters(
            contract_config,
            offchain_config,
            oracle_identities,
        )?;

        if !skip_resource_checks {
            check_resource_exhaustion(&config)?;
        }

        debug!(
            config_digest = %config.config_digest,
            n = config.n(),
            f = config.f,
            "Public config validated"
        );

        Ok(config)
    }
}

fn check_identity_lists_have_no_duplicates(
    contract_config: &ContractConfig,
    offchain_config: &OffchainConfig,
) -> ConfigResult<()> {
    for (i, a) in contract_config.signers.iter().enumerate() {
        for (j, b) in contract_config.signers.iter().enumerate() {
            if i != j && a == b {
                return Err(ConfigError::DuplicateSigner {
                    first: i,
                    second: j,
                    signer: hex::encode(a),
                });
            }
        }
    }

    let mut peer_ids = HashSet::new();
    for peer_id in &offchain_config.peer_ids {
        if !peer_ids.insert(peer_id) {
            return Err(ConfigError::DuplicatePeerId(peer_id.to_string()));
        }
    }

    let mut offchain_keys = HashSet::new();
    for key in &offchain_config.offchain_public_keys {
        if !offchain_keys.insert(key) {
            return Err(ConfigError::DuplicateOffchainPublicKey(hex::encode(key)));
        }
    }

    let mut transmitters = HashSet::new();
    for transmitter in &contract_config.transmitters {
        if !transmitters.insert(transmitter) {
            return Err(ConfigError::DuplicateTransmitter(transmitter.to_string()));
        }
    }

    Ok(())
}

fn check_identity_lists_have_the_same_length(
    contract_config: &ContractConfig,
    offchain_config: &OffchainConfig,
) -> ConfigResult<()> {
    let expected = contract_config.signers.len();
    let lists = [
        ("peer ids", offchain_config.peer_ids.len()),
        ("offchain public keys", offchain_config.offchain_public_keys.len()),
        ("transmitters", contract_config.transmitters.len()),
    ];
    for (name, length) in lists {
        if length != expected {
            return Err(ConfigError::IdentityListLength {
                name,
                length,
                expected,
            });
        }
    }
    Ok(())
}

fn non_negative(name: &'static str, value_ns: i64) -> ConfigResult<Duration> {
    if value_ns < 0 {
        return Err(ConfigError::NegativeDuration { name, value_ns });
    }
    Ok(Duration::from_nanos(value_ns as u64))
}

fn check_parameters(
    contract_config: &ContractConfig,
    oc: &OffchainConfig,
    oracle_identities: Vec<OracleIdentity>,
) -> ConfigResult<PublicConfig> {
    let delta_stage = non_negative("delta_stage", oc.delta_stage_ns)?;
    let delta_round = non_negative("delta_round", oc.delta_round_ns)?;
    let delta_progress = non_negative("delta_progress", oc.delta_progress_ns)?;
    let delta_resend = non_negative("delta_resend", oc.delta_resend_ns)?;

    let f = contract_config.f as usize;
    let n = oracle_identities.len();
    if f * 3 >= n {
        return Err(ConfigError::InvalidFaultTolerance { f, n });
    }
    if n > MAX_ORACLES {
        return Err(ConfigError::TooManyOracles {
            n,
            max: MAX_ORACLES,
        });
    }

    let delta_grace = non_negative("delta_grace", oc.delta_grace_ns)?;
    let max_duration_query = non_negative("max_duration_query", oc.max_duration_query_ns)?;
    let max_duration_observation =
        non_negative("max_duration_observation", oc.max_duration_observation_ns)?;
    let max_duration_report = non_negative("max_duration_report", oc.max_duration_report_ns)?;
    let max_duration_should_accept_finalized_report = non_negative(
        "max_duration_should_accept_finalized_report",
        oc.max_duration_should_accept_finalized_report_ns,
    )?;
    let max_duration_should_transmit_accepted_report = non_negative(
        "max_duration_should_transmit_accepted_report",
        oc.max_duration_should_transmit_accepted_report_ns,
    )?;

    if delta_round >= delta_progress {
        return Err(ConfigError::DeltaRoundNotBelowProgress {
            delta_round,
            delta_progress,
        });
    }

    let sum = max_duration_query
        .saturating_add(max_duration_observation)
        .saturating_add(max_duration_report);
    if sum >= delta_progress {
        return Err(ConfigError::MaxDurationsExceedProgress {
            sum,
            delta_progress,
        });
    }

    if !(0 < oc.r_max && oc.r_max < 255) {
        return Err(ConfigError::InvalidRMax(oc.r_max));
    }

    if oc.s.len() >= 1000 {
        return Err(ConfigError::TooManyStages(oc.s.len()));
    }
    let mut s = Vec::with_capacity(oc.s.len());
    for (index, &value) in oc.s.iter().enumerate() {
        if !(0..=MAX_ORACLES as i64).contains(&value) {
            return Err(ConfigError::InvalidStageSize {
                index,
                value,
                max: MAX_ORACLES,
            });
        }
        s.push(value as usize);
    }

    Ok(PublicConfig {
        delta_progress,
        delta_resend,
        delta_round,
        delta_grace,
        delta_stage,
        r_max: oc.r_max,
        s,
        oracle_identities,
        reporting_plugin_config: oc.reporting_plugin_config.clone(),
        max_duration_query,
        max_duration_observation,
        max_duration_report,
        max_duration_should_accept_finalized_report,
        max_duration_should_transmit_accepted_report,
        f,
        onchain_config: contract_config.onchain_config.clone(),
        config_digest: contract_config.config_digest,
    })
}

fn check_resource_exhaustion(config: &PublicConfig) -> ConfigResult<()> {
    for (name, value) in [
        ("delta_progress", config.delta_progress),
        ("delta_resend", config.delta_resend),
    ] {
        if value < RESOURCE_EXHAUSTION_SAFE_INTERVAL {
            return Err(ConfigError::BelowSafeInterval {
                name,
                value,
                min: RESOURCE_EXHAUSTION_SAFE_INTERVAL,
            });
        }
    }
    Ok(())
}
