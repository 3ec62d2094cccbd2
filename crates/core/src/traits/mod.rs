//! Collaborator traits of the oracle node.
//!
//! The runtime depends only on these traits. Production backends (chain RPC,
//! peer-to-peer networking, persistent storage) and in-memory test doubles
//! are interchangeable implementations.
//!
//! # Architecture
//!
//! - **Contract**: config tracking and report transmission
//! - **Crypto**: offchain and onchain keyrings, the config digester
//! - **Database**: crash-recovery persistence
//! - **Plugin**: application logic deciding what to report
//! - **Transport**: binary network endpoints
//! - **Monitoring**: telemetry sink

mod contract;
mod crypto;
mod database;
mod monitoring;
mod plugin;
mod transport;

pub use contract::*;
pub use crypto::*;
pub use database::*;
pub use monitoring::*;
pub use plugin::*;
pub use transport::*;
