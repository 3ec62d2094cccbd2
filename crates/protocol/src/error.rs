//! Verification errors

use ocrnode_types::OracleId;
use thiserror::Error;

/// Why an observation or report was rejected.
///
/// Any single defect rejects the whole message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Signature over a signed observation does not verify
    #[error("SignedObservation has invalid signature")]
    InvalidObservationSignature,

    /// Skipped attestation carries a report or a signature
    #[error("AttestedReportOne with skip=true has non-empty report or signature")]
    SkipWithPayload,

    /// Onchain signature over a single attestation does not verify
    #[error("failed to verify signature on AttestedReportOne")]
    InvalidReportSignature,

    /// Signature count differs from the quorum
    #[error("wrong number of signatures, expected {expected} and got {actual}")]
    WrongSignatureCount {
        /// Required quorum
        expected: usize,
        /// Signatures present
        actual: usize,
    },

    /// Same oracle signed twice
    #[error("duplicate signature by oracle {0}")]
    DuplicateSigner(OracleId),

    /// Signer index is not a configured oracle
    #[error("signer out of bounds: {0}")]
    SignerOutOfBounds(OracleId),

    /// One attributed signature does not verify
    #[error("{index}-th signature by oracle {signer} with public key {public_key} does not verify")]
    SignatureDoesNotVerify {
        /// Position in the signature list
        index: usize,
        /// Claimed signer
        signer: OracleId,
        /// Hex-encoded onchain key of the signer
        public_key: String,
    },
}

/// Result type for verification
pub type VerificationResult<T> = Result<T, VerificationError>;
