//! Offchain cross-check of contract config digests.

use crate::error::{ManagedError, ManagedResult};
use ocrnode_core::OffchainConfigDigester;
use ocrnode_types::{ConfigDigest, ContractConfig};
use std::sync::Arc;

/// Wraps an [`OffchainConfigDigester`] and checks every digest it produces
/// against the prefix it declares.
#[derive(Clone)]
pub struct PrefixCheckConfigDigester {
    inner: Arc<dyn OffchainConfigDigester>,
}

impl PrefixCheckConfigDigester {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn OffchainConfigDigester>) -> Self {
        Self { inner }
    }

    /// Compute the digest of `cc`, failing if its first two bytes are not the
    /// digester's declared prefix.
    pub fn config_digest(&self, cc: &ContractConfig) -> ManagedResult<ConfigDigest> {
        let expected = self.inner.config_digest_prefix().to_be_bytes();
        let digest = self.inner.config_digest(cc)?;
        let bytes = digest.as_bytes();
        let actual = [bytes[0], bytes[1]];
        if actual != expected {
            return Err(ManagedError::DigestPrefixMismatch { expected, actual });
        }
        Ok(digest)
    }

    /// Recompute the digest of `cc` and require it to equal `cc.config_digest`.
    pub fn check_contract_config(&self, cc: &ContractConfig) -> ManagedResult<()> {
        let expected = self.config_digest(cc)?;
        if expected != cc.config_digest {
            return Err(ManagedError::DigestMismatch {
                expected,
                actual: cc.config_digest,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for PrefixCheckConfigDigester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixCheckConfigDigester")
            .field("prefix", &self.inner.config_digest_prefix())
            .finish()
    }
}
