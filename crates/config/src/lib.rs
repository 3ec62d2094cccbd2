//! # OCR Node Configuration
//!
//! Two kinds of configuration live here:
//!
//! - **Local** configuration of one node ([`NodeConfig`]): timeouts, chain
//!   settings and logging, loaded from a single TOML file.
//! - **Shared** configuration of all oracles of a config digest
//!   ([`SharedConfig`]): decoded from a [`ContractConfig`] published on chain
//!   and validated against the bounds the protocol depends on.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ocrnode_config::{NodeConfig, PlaintextOffchainConfigDecoder, SharedConfig};
//! use std::path::Path;
//!
//! let config = NodeConfig::load(Path::new("ocrnode.toml"))?;
//! config.logging.try_init()?;
//!
//! let (shared, oracle_id) = SharedConfig::from_contract_config(
//!     &contract_config,
//!     &PlaintextOffchainConfigDecoder,
//!     &config.oracle,
//!     &my_identity,
//! )?;
//! ```
//!
//! [`ContractConfig`]: ocrnode_types::ContractConfig

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

mod error;
mod local;
mod offchain;
mod public_config;
mod shared;

pub use error::*;
pub use local::{LocalConfig, LoggingConfig, NodeConfig};
pub use offchain::{
    OffchainConfig, OffchainConfigDecoder, PlaintextOffchainConfigDecoder,
    OFFCHAIN_CONFIG_VERSION,
};
pub use public_config::{PublicConfig, RESOURCE_EXHAUSTION_SAFE_INTERVAL};
pub use shared::{LocalIdentity, SharedConfig};
