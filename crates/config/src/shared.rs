//! The public config plus the secret shared among its oracles.

use crate::error::{ConfigError, ConfigResult};
use crate::local::LocalConfig;
use crate::offchain::OffchainConfigDecoder;
use crate::public_config::PublicConfig;
use ocrnode_types::{Account, ContractConfig, OffchainPublicKey, OnchainPublicKey, OracleId, PeerId};
use sha3::{Digest, Keccak256};
use std::ops::Deref;
use std::time::Duration;
use tracing::info;

/// Domain separator for deriving the transmission order key.
const TRANSMISSION_ORDER_KEY_DOMAIN: &[u8] = b"ocrnode transmission order key v1";

/// The local node's identity, matched against the configured oracle identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    /// This node's ed25519 key
    pub offchain_public_key: OffchainPublicKey,
    /// This node's onchain signing key (or address)
    pub onchain_public_key: OnchainPublicKey,
    /// This node's peer id
    pub peer_id: PeerId,
    /// Account this node transmits from
    pub transmit_account: Account,
}

/// [`PublicConfig`] plus the shared secret of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedConfig {
    /// Validated public parameters
    pub public: PublicConfig,
    shared_secret: [u8; 16],
}

impl Deref for SharedConfig {
    type Target = PublicConfig;

    fn deref(&self) -> &Self::Target {
        &self.public
    }
}

impl SharedConfig {
    /// Wrap an already validated public config.
    pub fn new(public: PublicConfig, shared_secret: [u8; 16]) -> Self {
        Self {
            public,
            shared_secret,
        }
    }

    /// Decode, validate and locate this node in `contract_config`.
    ///
    /// `max_duration_query` is raised to the local floor before validation.
    /// Fails with [`ConfigError::OwnIdentityNotFound`] when this node's
    /// offchain key is not part of the configuration, and with
    /// [`ConfigError::OwnIdentityMismatch`] when it is but another identity
    /// column disagrees.
    pub fn from_contract_config(
        contract_config: &ContractConfig,
        decoder: &dyn OffchainConfigDecoder,
        local_config: &LocalConfig,
        me: &LocalIdentity,
    ) -> ConfigResult<(Self, OracleId)> {
        let mut offchain_config = decoder.decode(&contract_config.offchain_config)?;

        let floor_ns = i64::try_from(local_config.min_ocr2_max_duration_query().as_nanos())
            .unwrap_or(i64::MAX);
        if offchain_config.max_duration_query_ns < floor_ns {
            offchain_config.max_duration_query_ns = floor_ns;
        }

        let public = PublicConfig::validate(
            contract_config,
            &offchain_config,
            local_config.development_mode,
        )?;

        let oracle_id = find_own_oracle_id(&public, me)?;

        info!(
            config_digest = %public.config_digest,
            oracle_id = %oracle_id,
            n = public.n(),
            f = public.f,
            "Located own identity in config"
        );

        Ok((Self::new(public, offchain_config.shared_secret), oracle_id))
    }

    /// 16-byte key seeding the per-round transmission order.
    ///
    /// Known to every oracle of the configuration and to nobody else, so an
    /// outsider cannot predict which oracle transmits first.
    pub fn transmission_order_key(&self) -> [u8; 16] {
        let mut hasher = Keccak256::new();
        hasher.update(self.shared_secret);
        hasher.update(TRANSMISSION_ORDER_KEY_DOMAIN);
        let hash: [u8; 32] = hasher.finalize().into();
        let mut key = [0u8; 16];
        key.copy_from_slice(&hash[..16]);
        key
    }

    /// Expected interval between two rounds.
    pub fn estimated_round_interval(&self) -> Duration {
        self.public.delta_round
    }
}

fn find_own_oracle_id(public: &PublicConfig, me: &LocalIdentity) -> ConfigResult<OracleId> {
    let Some(index) = public
        .oracle_identities
        .iter()
        .position(|identity| identity.offchain_public_key == me.offchain_public_key)
    else {
        return Err(ConfigError::OwnIdentityNotFound(hex::encode(
            me.offchain_public_key,
        )));
    };

    let identity = &public.oracle_identities[index];
    if identity.onchain_public_key != me.onchain_public_key {
        return Err(ConfigError::OwnIdentityMismatch {
            field: "onchain public key",
            configured: hex::encode(&identity.onchain_public_key),
            mine: hex::encode(&me.onchain_public_key),
        });
    }
    if identity.peer_id != me.peer_id {
        return Err(ConfigError::OwnIdentityMismatch {
            field: "peer id",
            configured: identity.peer_id.to_string(),
            mine: me.peer_id.to_string(),
        });
    }
    if identity.transmit_account != me.transmit_account {
        return Err(ConfigError::OwnIdentityMismatch {
            field: "transmit account",
            configured: identity.transmit_account.to_string(),
            mine: me.transmit_account.to_string(),
        });
    }

    // n <= MAX_ORACLES was validated, so the index fits
    Ok(OracleId(index as u8))
}
