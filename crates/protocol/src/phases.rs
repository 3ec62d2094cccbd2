//! The seam between the runtime and the epoch/round protocol phases.
//!
//! ```text
//!   network ──► Oracle ──(NewEpoch)──────────────► Pacemaker
//!                 │   ◄──(epoch watch)──────────────┘  │ owns
//!                 ├──(ObserveReq..Report)─────► ReportGeneration
//!                 │                                    │ EventFinal
//!                 └──(Final, FinalEcho)──────► ReportFinalization
//!                                                      │ EventTransmit
//!                                                      ▼
//!                                               TransmissionScheduler
//! ```
//!
//! Leader election and report assembly are supplied through
//! [`ProtocolPhases`]; the runtime only wires channels and lifetimes.

use crate::attested_report::AttestedReportMany;
use crate::endpoint::SerializingEndpoint;
use crate::messages::{EventTransmit, MessageWithSender};
use crate::telemetry::TelemetrySender;
use async_trait::async_trait;
use ocrnode_config::{LocalConfig, SharedConfig};
use ocrnode_core::{Database, OffchainKeyring, OnchainKeyring, ReportingPlugin};
use ocrnode_types::{OracleId, Query};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Everything the phases of one configuration share. Read-only.
#[derive(Clone)]
pub struct PhaseContext {
    /// Validated configuration
    pub config: Arc<SharedConfig>,
    /// This oracle's index
    pub oracle_id: OracleId,
    /// Number of signatures a finalized report carries
    pub report_quorum: usize,
    /// Local timeouts
    pub local_config: LocalConfig,
    /// Reporting plugin of this configuration
    pub plugin: Arc<dyn ReportingPlugin>,
    /// Signs protocol messages
    pub offchain_keyring: Arc<dyn OffchainKeyring>,
    /// Signs reports
    pub onchain_keyring: Arc<dyn OnchainKeyring>,
    /// Persistent state
    pub database: Arc<dyn Database>,
    /// Outbound messaging
    pub network: Arc<SerializingEndpoint>,
    /// Telemetry sink
    pub telemetry: TelemetrySender,
}

/// A report that reached quorum in report generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFinal {
    /// Epoch
    pub epoch: u32,
    /// Round
    pub round: u8,
    /// Leader's query
    pub query: Query,
    /// The attested report
    pub report: AttestedReportMany,
}

/// Channels of the Pacemaker, which also drives report generation.
pub struct PacemakerIo {
    /// `NewEpoch` messages
    pub from_network: mpsc::Receiver<MessageWithSender>,
    /// Report generation messages of the current epoch
    pub report_generation_from_network: mpsc::Receiver<MessageWithSender>,
    /// Publishes the local epoch to the runtime
    pub epoch: watch::Sender<u32>,
    /// Reports that reached quorum
    pub to_report_finalization: mpsc::Sender<EventFinal>,
}

/// Channels of report finalization.
pub struct ReportFinalizationIo {
    /// `Final` and `FinalEcho` messages
    pub from_network: mpsc::Receiver<MessageWithSender>,
    /// Reports finalized locally
    pub from_report_generation: mpsc::Receiver<EventFinal>,
    /// Reports ready for transmission
    pub to_transmission: mpsc::Sender<EventTransmit>,
}

/// Supplies the Pacemaker (with report generation) and report finalization.
///
/// Both run until `cancel` fires and must not touch any shared resource
/// after returning.
#[async_trait]
pub trait ProtocolPhases: Send + Sync + 'static {
    /// Run the Pacemaker and the report generation it owns.
    async fn run_pacemaker(&self, ctx: PhaseContext, io: PacemakerIo, cancel: CancellationToken);

    /// Run report finalization.
    async fn run_report_finalization(
        &self,
        ctx: PhaseContext,
        io: ReportFinalizationIo,
        cancel: CancellationToken,
    );
}
