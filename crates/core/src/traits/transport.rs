//! Binary network endpoints scoped to one configuration.
//!
//! An endpoint moves opaque byte payloads between the oracles of a single
//! config digest. Encoding protocol messages on top of it is the caller's
//! concern.

use async_trait::async_trait;
use bytes::Bytes;
use ocrnode_types::{BinaryNetworkEndpointLimits, ConfigDigest, OracleId, PeerId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during network operations.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The endpoint could not be created or started.
    #[error("endpoint setup failed: {0}")]
    Setup(String),

    /// The endpoint has already been started.
    #[error("endpoint already started")]
    AlreadyStarted,

    /// The endpoint is closed.
    #[error("endpoint closed")]
    Closed,

    /// Message too large.
    #[error("message too large: {size} > {max}")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Generic network error.
    #[error("network error: {0}")]
    Internal(String),
}

/// Result type for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// An inbound payload and the oracle that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMessageWithSender {
    /// Raw payload
    pub msg: Bytes,
    /// Sender's oracle id, as claimed by the transport
    pub sender: OracleId,
}

/// Point-to-point and broadcast messaging among the oracles of one config.
///
/// Sends are fire-and-forget: delivery is not guaranteed and failures are not
/// reported back.
#[async_trait]
pub trait BinaryNetworkEndpoint: Send + Sync + 'static {
    /// Send `payload` to oracle `to`.
    fn send_to(&self, payload: Bytes, to: OracleId);

    /// Send `payload` to every oracle, including this one.
    fn broadcast(&self, payload: Bytes);

    /// Take the inbound message stream. Returns `None` after the first call.
    fn receive(&self) -> Option<mpsc::Receiver<BinaryMessageWithSender>>;

    /// Start delivering messages.
    async fn start(&self) -> NetworkResult<()>;

    /// Stop the endpoint and release its resources.
    async fn close(&self) -> NetworkResult<()>;
}

/// Creates endpoints for new configurations.
pub trait BinaryNetworkEndpointFactory: Send + Sync + 'static {
    /// Create an endpoint connecting the given peers, indexed by oracle id.
    fn new_endpoint(
        &self,
        config_digest: ConfigDigest,
        peer_ids: &[PeerId],
        f: usize,
        limits: BinaryNetworkEndpointLimits,
    ) -> NetworkResult<Arc<dyn BinaryNetworkEndpoint>>;

    /// This node's peer id.
    fn peer_id(&self) -> PeerId;
}
