//! Round identifiers, report contexts and the persisted protocol state.

use crate::{ConfigDigest, OracleId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::SystemTime;

/// Opaque report bytes, as produced by the reporting plugin.
pub type Report = Vec<u8>;

/// Opaque query bytes chosen by the round leader.
pub type Query = Vec<u8>;

/// Opaque observation bytes produced by one oracle.
pub type Observation = Vec<u8>;

/// Identifies one round of one configuration.
///
/// Ordered by `(epoch, round)`; the digest only breaks ties so that the order
/// stays consistent with equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportTimestamp {
    /// Configuration the round belongs to
    pub config_digest: ConfigDigest,
    /// Epoch number
    pub epoch: u32,
    /// Round within the epoch
    pub round: u8,
}

impl ReportTimestamp {
    /// Creates a new timestamp.
    pub const fn new(config_digest: ConfigDigest, epoch: u32, round: u8) -> Self {
        Self {
            config_digest,
            epoch,
            round,
        }
    }
}

impl Ord for ReportTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then(self.round.cmp(&other.round))
            .then(self.config_digest.cmp(&other.config_digest))
    }
}

impl PartialOrd for ReportTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReportTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/e{}/r{}", self.config_digest, self.epoch, self.round)
    }
}

/// Everything a report signature commits to besides the report itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportContext {
    /// Round the report was produced in
    pub report_timestamp: ReportTimestamp,
    /// Hash binding the report to the query and observations it came from
    pub extra_hash: [u8; 32],
}

impl ReportContext {
    /// Creates a new report context.
    pub const fn new(report_timestamp: ReportTimestamp, extra_hash: [u8; 32]) -> Self {
        Self {
            report_timestamp,
            extra_hash,
        }
    }
}

/// An onchain signature together with the oracle that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributedOnchainSignature {
    /// Signature bytes
    pub signature: Vec<u8>,
    /// Signer's oracle id
    pub signer: OracleId,
}

/// An observation together with the oracle that made it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributedObservation {
    /// Observation bytes
    pub observation: Observation,
    /// Observer's oracle id
    pub observer: OracleId,
}

/// A finalized report waiting for its scheduled transmission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransmission {
    /// When this oracle should transmit
    pub time: SystemTime,
    /// Extra hash of the report context
    pub extra_hash: [u8; 32],
    /// Report bytes
    pub report: Report,
    /// Quorum of signatures over the report
    pub attributed_signatures: Vec<AttributedOnchainSignature>,
}

/// Protocol state persisted across restarts, one per config digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
    /// Current epoch
    pub epoch: u32,
    /// Highest epoch this oracle has sent a new-epoch message for
    pub highest_sent_epoch: u32,
    /// Highest epoch received from each oracle, indexed by oracle id
    pub highest_received_epoch: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_orders_by_epoch_then_round() {
        let digest = ConfigDigest::new([7; 32]);
        let a = ReportTimestamp::new(digest, 1, 200);
        let b = ReportTimestamp::new(digest, 2, 0);
        let c = ReportTimestamp::new(digest, 2, 1);
        assert!(a < b);
        assert!(b < c);

        let mut ts = vec![c, a, b];
        ts.sort();
        assert_eq!(ts, vec![a, b, c]);
    }

    #[test]
    fn test_timestamp_order_ignores_digest_first() {
        let low = ReportTimestamp::new(ConfigDigest::new([0xFF; 32]), 1, 0);
        let high = ReportTimestamp::new(ConfigDigest::new([0x00; 32]), 1, 1);
        assert!(low < high);
    }
}
