//! # OCR Node Storage
//!
//! [`Database`](ocrnode_core::Database) backends:
//!
//! - [`InMemoryDatabase`]: volatile, for tests and ephemeral nodes
//! - [`FileDatabase`]: a single JSON document, rewritten atomically on every change
//!
//! Both hold the same [`Tables`]: protocol state per config digest, the latest
//! contract config, and pending transmissions keyed by round.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod file;
pub mod memory;
pub mod tables;

pub use file::FileDatabase;
pub use memory::InMemoryDatabase;
pub use tables::Tables;
