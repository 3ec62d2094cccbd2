//! Messages exchanged between oracles, and events passed between phases.

use crate::attested_report::{AttestedReportMany, AttestedReportOne};
use crate::observation::{AttributedSignedObservation, SignedObservation};
use ocrnode_types::{OracleId, Query};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The phase a message is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Leader election
    Pacemaker,
    /// Observation collection and report assembly within an epoch
    ReportGeneration,
    /// Reliable broadcast of finalized reports
    ReportFinalization,
}

/// A protocol message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolMessage {
    /// Sender wants to move to `epoch`
    NewEpoch {
        /// Proposed epoch
        epoch: u32,
    },
    /// Leader asks followers to observe
    ObserveReq {
        /// Epoch
        epoch: u32,
        /// Round
        round: u8,
        /// Leader's query
        query: Query,
    },
    /// Follower's signed observation
    Observe {
        /// Epoch
        epoch: u32,
        /// Round
        round: u8,
        /// The observation
        signed_observation: SignedObservation,
    },
    /// Leader asks followers to sign a report over the collected observations
    ReportReq {
        /// Epoch
        epoch: u32,
        /// Round
        round: u8,
        /// Leader's query
        query: Query,
        /// Observations the report is built from
        attributed_signed_observations: Vec<AttributedSignedObservation>,
    },
    /// Follower's attestation of the report
    Report {
        /// Epoch
        epoch: u32,
        /// Round
        round: u8,
        /// Signed or skipped report
        report: AttestedReportOne,
    },
    /// Leader's finalized report
    Final {
        /// Epoch
        epoch: u32,
        /// Round
        round: u8,
        /// Leader's query
        query: Query,
        /// Report with a quorum of signatures
        report: AttestedReportMany,
    },
    /// Echo of a finalized report
    FinalEcho {
        /// Epoch
        epoch: u32,
        /// Round
        round: u8,
        /// Leader's query
        query: Query,
        /// Report with a quorum of signatures
        report: AttestedReportMany,
    },
}

impl ProtocolMessage {
    /// Epoch the message belongs to.
    pub fn epoch(&self) -> u32 {
        match self {
            Self::NewEpoch { epoch }
            | Self::ObserveReq { epoch, .. }
            | Self::Observe { epoch, .. }
            | Self::ReportReq { epoch, .. }
            | Self::Report { epoch, .. }
            | Self::Final { epoch, .. }
            | Self::FinalEcho { epoch, .. } => *epoch,
        }
    }

    /// Phase the message is addressed to.
    pub fn phase(&self) -> Phase {
        match self {
            Self::NewEpoch { .. } => Phase::Pacemaker,
            Self::ObserveReq { .. }
            | Self::Observe { .. }
            | Self::ReportReq { .. }
            | Self::Report { .. } => Phase::ReportGeneration,
            Self::Final { .. } | Self::FinalEcho { .. } => Phase::ReportFinalization,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewEpoch { .. } => "NewEpoch",
            Self::ObserveReq { .. } => "ObserveReq",
            Self::Observe { .. } => "Observe",
            Self::ReportReq { .. } => "ReportReq",
            Self::Report { .. } => "Report",
            Self::Final { .. } => "Final",
            Self::FinalEcho { .. } => "FinalEcho",
        }
    }
}

/// A decoded message and the oracle it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageWithSender {
    /// The message
    pub msg: ProtocolMessage,
    /// Sender as reported by the transport
    pub sender: OracleId,
}

/// Position within the protocol, ordered by epoch then round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EpochRound {
    /// Epoch
    pub epoch: u32,
    /// Round within the epoch
    pub round: u8,
}

impl Ord for EpochRound {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.epoch, self.round).cmp(&(other.epoch, other.round))
    }
}

impl PartialOrd for EpochRound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EpochRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.epoch, self.round)
    }
}

/// A finalized report handed from report finalization to transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTransmit {
    /// Epoch the report was finalized in
    pub epoch: u32,
    /// Round the report was finalized in
    pub round: u8,
    /// Extra hash of the report context
    pub extra_hash: [u8; 32],
    /// The attested report
    pub report: AttestedReportMany,
}
