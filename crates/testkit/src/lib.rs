//! # OCR Node Test Kit
//!
//! In-process stand-ins for everything the oracle talks to, plus fixtures
//! that build valid configurations for a cluster of test oracles.
//!
//! ```ignore
//! let cluster = TestCluster::new(4, 1);
//! let (shared, oracle_id) = cluster.shared_config(0);
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod monitoring;
pub mod network;
pub mod phases;
pub mod plugin;
pub mod tracker;
pub mod transmitter;

pub use fixtures::{create_test_offchain_config, init_test_logging, TestCluster, TestOracle};
pub use monitoring::RecordingMonitoringEndpoint;
pub use network::{LoopbackEndpoint, LoopbackEndpointFactory, LoopbackNetwork};
pub use phases::ScriptedPhases;
pub use plugin::{MockReportingPlugin, MockReportingPluginFactory};
pub use tracker::MockConfigTracker;
pub use transmitter::{RecordedTransmission, RecordingTransmitter};
