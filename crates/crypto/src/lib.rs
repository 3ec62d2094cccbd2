//! # OCR Node Crypto
//!
//! Cryptographic building blocks of the oracle node.
//!
//! This crate provides:
//! - **Keccak-256 / SHA-256 hashing** - on-chain compatible digests
//! - **Ed25519 offchain keyring** - signs protocol messages between oracles
//! - **secp256k1 onchain keyring** - signs reports the way EVM contracts verify them
//! - **Config digester** - recomputes config digests offchain
//!
//! ## Example
//!
//! ```rust
//! use ocrnode_core::OnchainKeyring;
//! use ocrnode_crypto::EvmOnchainKeyring;
//! use ocrnode_types::{ConfigDigest, ReportContext, ReportTimestamp};
//!
//! let keyring = EvmOnchainKeyring::random();
//! let ctx = ReportContext::new(ReportTimestamp::new(ConfigDigest::ZERO, 1, 1), [0; 32]);
//!
//! let sig = keyring.sign(&ctx, b"report").unwrap();
//! assert!(keyring.verify(&keyring.public_key(), &ctx, b"report", &sig));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod digester;
pub mod ecdsa;
pub mod hash;
pub mod offchain;

pub use digester::KeccakConfigDigester;
pub use ecdsa::{Address, EvmOnchainKeyring, EVM_SIGNATURE_LENGTH};
pub use hash::{keccak256, keccak256_concat, Hasher};
pub use offchain::{verify_offchain_signature, Ed25519OffchainKeyring, OFFCHAIN_SIGNATURE_LENGTH};

/// Common type alias for 32-byte hash
pub type Hash = [u8; 32];
