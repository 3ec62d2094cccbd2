//! Typed messaging on top of a [`BinaryNetworkEndpoint`].

use crate::messages::{MessageWithSender, ProtocolMessage};
use bytes::Bytes;
use ocrnode_core::{BinaryMessageWithSender, BinaryNetworkEndpoint, NetworkError, NetworkResult};
use ocrnode_types::OracleId;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Capacity of the decoded inbound channel.
const INBOUND_CHANNEL_CAPACITY: usize = 64;

/// Encode a message for the wire.
pub fn encode(msg: &ProtocolMessage) -> Result<Bytes, bincode::Error> {
    bincode::serialize(msg).map(Bytes::from)
}

/// Decode a message from the wire.
pub fn decode(payload: &[u8]) -> Result<ProtocolMessage, bincode::Error> {
    bincode::deserialize(payload)
}

/// Encodes outbound [`ProtocolMessage`]s and decodes inbound ones.
///
/// Inbound frames that exceed the configured maximum length or fail to decode
/// are dropped with a log line.
pub struct SerializingEndpoint {
    inner: Arc<dyn BinaryNetworkEndpoint>,
    max_message_length: usize,
    decoder: Mutex<Option<JoinHandle<()>>>,
}

impl SerializingEndpoint {
    /// Wrap `inner`, accepting inbound frames up to `max_message_length` bytes.
    pub fn new(inner: Arc<dyn BinaryNetworkEndpoint>, max_message_length: usize) -> Self {
        Self {
            inner,
            max_message_length,
            decoder: Mutex::new(None),
        }
    }

    /// Send `msg` to oracle `to`.
    pub fn send_to(&self, msg: &ProtocolMessage, to: OracleId) {
        match encode(msg) {
            Ok(payload) => self.inner.send_to(payload, to),
            Err(e) => error!(error = %e, msg = msg.name(), "Failed to encode message"),
        }
    }

    /// Send `msg` to every oracle.
    pub fn broadcast(&self, msg: &ProtocolMessage) {
        match encode(msg) {
            Ok(payload) => self.inner.broadcast(payload),
            Err(e) => error!(error = %e, msg = msg.name(), "Failed to encode message"),
        }
    }

    /// Start the underlying endpoint and return the decoded inbound stream.
    ///
    /// Fails with [`NetworkError::AlreadyStarted`] on a second call.
    pub async fn start(&self) -> NetworkResult<mpsc::Receiver<MessageWithSender>> {
        let Some(raw) = self.inner.receive() else {
            return Err(NetworkError::AlreadyStarted);
        };
        self.inner.start().await?;

        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let handle = tokio::spawn(decode_loop(raw, tx, self.max_message_length));
        *self.decoder.lock() = Some(handle);
        Ok(rx)
    }

    /// Stop decoding and close the underlying endpoint.
    pub async fn close(&self) -> NetworkResult<()> {
        if let Some(handle) = self.decoder.lock().take() {
            handle.abort();
        }
        self.inner.close().await
    }
}

async fn decode_loop(
    mut raw: mpsc::Receiver<BinaryMessageWithSender>,
    tx: mpsc::Sender<MessageWithSender>,
    max_message_length: usize,
) {
    while let Some(BinaryMessageWithSender { msg, sender }) = raw.recv().await {
        if msg.len() > max_message_length {
            warn!(
                sender = %sender,
                size = msg.len(),
                max = max_message_length,
                "Dropping oversized message"
            );
            continue;
        }

        let msg = match decode(&msg) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(sender = %sender, error = %e, "Dropping undecodable message");
                continue;
            }
        };

        if tx.send(MessageWithSender { msg, sender }).await.is_err() {
            break;
        }
    }
    debug!("SerializingEndpoint: decoder exiting");
}
