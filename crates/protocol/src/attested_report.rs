//! Attestations of a report by one oracle, and by a quorum of oracles.

use crate::error::{VerificationError, VerificationResult};
use ocrnode_core::{KeyringResult, OnchainKeyring};
use ocrnode_types::{
    AttributedOnchainSignature, OnchainPublicKey, OracleId, OracleIdentity, Report, ReportContext,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One oracle's answer to a report request: either a signed report, or a skip.
///
/// A skip carries neither report nor signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedReportOne {
    /// Whether the oracle declined to produce a report this round
    pub skip: bool,
    /// The report, empty when skipping
    pub report: Report,
    /// Onchain signature over (report context, report), empty when skipping
    pub signature: Vec<u8>,
}

impl AttestedReportOne {
    /// A skip attestation.
    pub fn skip() -> Self {
        Self {
            skip: true,
            report: Vec::new(),
            signature: Vec::new(),
        }
    }

    /// Sign `report` under `ctx`.
    pub fn noskip(
        ctx: &ReportContext,
        report: Report,
        keyring: &dyn OnchainKeyring,
    ) -> KeyringResult<Self> {
        let signature = keyring.sign(ctx, &report)?;
        Ok(Self {
            skip: false,
            report,
            signature,
        })
    }

    /// Same decision and report, ignoring the signature.
    pub fn eq_except_signature(&self, other: &Self) -> bool {
        self.skip == other.skip && self.report == other.report
    }

    /// Check the skip invariant, or the signature of a non-skip attestation.
    pub fn verify(
        &self,
        keyring: &dyn OnchainKeyring,
        public_key: &OnchainPublicKey,
        ctx: &ReportContext,
    ) -> VerificationResult<()> {
        if self.skip {
            if !self.report.is_empty() || !self.signature.is_empty() {
                return Err(VerificationError::SkipWithPayload);
            }
            return Ok(());
        }

        if keyring.verify(public_key, ctx, &self.report, &self.signature) {
            Ok(())
        } else {
            Err(VerificationError::InvalidReportSignature)
        }
    }
}

/// A report with the signatures of a quorum of oracles, ready for the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedReportMany {
    /// The report all signers agreed on
    pub report: Report,
    /// One signature per signer
    pub attributed_signatures: Vec<AttributedOnchainSignature>,
}

impl AttestedReportMany {
    /// Verify that exactly `quorum` distinct, configured oracles signed the report.
    ///
    /// Fails on the first defect.
    pub fn verify_signatures(
        &self,
        quorum: usize,
        keyring: &dyn OnchainKeyring,
        oracle_identities: &[OracleIdentity],
        ctx: &ReportContext,
    ) -> VerificationResult<()> {
        if self.attributed_signatures.len() != quorum {
            return Err(VerificationError::WrongSignatureCount {
                expected: quorum,
                actual: self.attributed_signatures.len(),
            });
        }

        let mut seen: HashSet<OracleId> = HashSet::with_capacity(quorum);
        for (index, sig) in self.attributed_signatures.iter().enumerate() {
            if !seen.insert(sig.signer) {
                return Err(VerificationError::DuplicateSigner(sig.signer));
            }
            let Some(identity) = oracle_identities.get(sig.signer.index()) else {
                return Err(VerificationError::SignerOutOfBounds(sig.signer));
            };
            if !keyring.verify(
                &identity.onchain_public_key,
                ctx,
                &self.report,
                &sig.signature,
            ) {
                return Err(VerificationError::SignatureDoesNotVerify {
                    index,
                    signer: sig.signer,
                    public_key: hex::encode(&identity.onchain_public_key),
                });
            }
        }

        Ok(())
    }
}
