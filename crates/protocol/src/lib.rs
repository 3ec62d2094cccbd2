//! # OCR Node Protocol
//!
//! The per-configuration core of the oracle:
//!
//! - [`SignedObservation`] and [`AttestedReportOne`]/[`AttestedReportMany`]:
//!   signing and quorum verification
//! - [`Oracle`]: epoch-ordered routing of network messages to the protocol
//!   phases, which are supplied through [`ProtocolPhases`]
//! - [`TransmissionScheduler`]: deterministic, staggered, crash-recoverable
//!   submission of finalized reports
//! - [`SerializingEndpoint`]: typed messaging over a binary endpoint
//!
//! ## Lifecycle
//!
//! ```text
//! Oracle::run ──spawns──► Pacemaker (+ ReportGeneration)
//!             ──spawns──► ReportFinalization
//!             ──spawns──► TransmissionScheduler ──spawns──► persist task
//!
//! cancel ──► stop routing ──► cancel children ──► join children ──► return
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod attested_report;
pub mod bounded;
pub mod endpoint;
pub mod error;
pub mod message_buffer;
pub mod messages;
pub mod observation;
pub mod oracle;
pub mod phases;
pub mod telemetry;
pub mod transmission;

pub use attested_report::{AttestedReportMany, AttestedReportOne};
pub use bounded::{with_timeout, with_timeout_and_warning, BoundedError};
pub use endpoint::SerializingEndpoint;
pub use error::{VerificationError, VerificationResult};
pub use message_buffer::MessageBuffer;
pub use messages::{EpochRound, EventTransmit, MessageWithSender, Phase, ProtocolMessage};
pub use observation::{AttributedSignedObservation, SignedObservation};
pub use oracle::{Oracle, Router};
pub use phases::{EventFinal, PacemakerIo, PhaseContext, ProtocolPhases, ReportFinalizationIo};
pub use telemetry::{TelemetryEvent, TelemetrySender};
pub use transmission::delays::DelaySchedule;
pub use transmission::{transmit_delay, TransmissionScheduler};
