//! In-process network connecting the endpoints of several oracles.

use async_trait::async_trait;
use bytes::Bytes;
use ocrnode_core::{
    BinaryMessageWithSender, BinaryNetworkEndpoint, BinaryNetworkEndpointFactory, NetworkError,
    NetworkResult,
};
use ocrnode_types::{BinaryNetworkEndpointLimits, ConfigDigest, OracleId, PeerId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

const ENDPOINT_CHANNEL_CAPACITY: usize = 256;

/// Delivers payloads between endpoints of the same config digest.
#[derive(Debug, Default)]
pub struct LoopbackNetwork {
    inboxes: Mutex<HashMap<(ConfigDigest, OracleId), mpsc::Sender<BinaryMessageWithSender>>>,
}

impl LoopbackNetwork {
    /// Empty network.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Endpoint of `oracle_id` among `n` oracles of `config_digest`.
    pub fn endpoint(
        self: &Arc<Self>,
        config_digest: ConfigDigest,
        oracle_id: OracleId,
        n: usize,
    ) -> Arc<LoopbackEndpoint> {
        let (tx, rx) = mpsc::channel(ENDPOINT_CHANNEL_CAPACITY);
        self.inboxes.lock().insert((config_digest, oracle_id), tx);
        Arc::new(LoopbackEndpoint {
            network: Arc::clone(self),
            config_digest,
            oracle_id,
            n,
            inbox: Mutex::new(Some(rx)),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Deliver raw bytes to `to` as if `from` had sent them.
    pub fn inject(&self, config_digest: ConfigDigest, from: OracleId, to: OracleId, msg: Bytes) {
        self.deliver(config_digest, from, to, msg);
    }

    fn deliver(&self, config_digest: ConfigDigest, from: OracleId, to: OracleId, msg: Bytes) {
        let inboxes = self.inboxes.lock();
        match inboxes.get(&(config_digest, to)) {
            Some(tx) => {
                if tx.try_send(BinaryMessageWithSender { msg, sender: from }).is_err() {
                    trace!(%from, %to, "Loopback inbox full or closed, dropping");
                }
            }
            None => trace!(%from, %to, "No loopback endpoint, dropping"),
        }
    }

    fn unregister(&self, config_digest: ConfigDigest, oracle_id: OracleId) {
        self.inboxes.lock().remove(&(config_digest, oracle_id));
    }
}

/// One oracle's view of a [`LoopbackNetwork`].
#[derive(Debug)]
pub struct LoopbackEndpoint {
    network: Arc<LoopbackNetwork>,
    config_digest: ConfigDigest,
    oracle_id: OracleId,
    n: usize,
    inbox: Mutex<Option<mpsc::Receiver<BinaryMessageWithSender>>>,
    started: AtomicBool,
    closed: AtomicBool,
}

impl LoopbackEndpoint {
    /// Whether `start` has been called.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BinaryNetworkEndpoint for LoopbackEndpoint {
    fn send_to(&self, payload: Bytes, to: OracleId) {
        if self.is_closed() {
            return;
        }
        self.network
            .deliver(self.config_digest, self.oracle_id, to, payload);
    }

    fn broadcast(&self, payload: Bytes) {
        if self.is_closed() {
            return;
        }
        for i in 0..self.n {
            self.network.deliver(
                self.config_digest,
                self.oracle_id,
                OracleId(i as u8),
                payload.clone(),
            );
        }
    }

    fn receive(&self) -> Option<mpsc::Receiver<BinaryMessageWithSender>> {
        self.inbox.lock().take()
    }

    async fn start(&self) -> NetworkResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(NetworkError::AlreadyStarted);
        }
        Ok(())
    }

    async fn close(&self) -> NetworkResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(NetworkError::Closed);
        }
        self.network.unregister(self.config_digest, self.oracle_id);
        Ok(())
    }
}

/// Creates [`LoopbackEndpoint`]s for one peer, locating it by peer id.
#[derive(Debug)]
pub struct LoopbackEndpointFactory {
    network: Arc<LoopbackNetwork>,
    peer_id: PeerId,
    created: Mutex<Vec<(ConfigDigest, BinaryNetworkEndpointLimits)>>,
    endpoints: Mutex<Vec<Arc<LoopbackEndpoint>>>,
}

impl LoopbackEndpointFactory {
    /// Factory for `peer_id` on `network`.
    pub fn new(network: Arc<LoopbackNetwork>, peer_id: PeerId) -> Self {
        Self {
            network,
            peer_id,
            created: Mutex::new(Vec::new()),
            endpoints: Mutex::new(Vec::new()),
        }
    }

    /// Digest and limits of every endpoint created so far.
    pub fn created(&self) -> Vec<(ConfigDigest, BinaryNetworkEndpointLimits)> {
        self.created.lock().clone()
    }

    /// Every endpoint created so far.
    pub fn endpoints(&self) -> Vec<Arc<LoopbackEndpoint>> {
        self.endpoints.lock().clone()
    }
}

impl BinaryNetworkEndpointFactory for LoopbackEndpointFactory {
    fn new_endpoint(
        &self,
        config_digest: ConfigDigest,
        peer_ids: &[PeerId],
        _f: usize,
        limits: BinaryNetworkEndpointLimits,
    ) -> NetworkResult<Arc<dyn BinaryNetworkEndpoint>> {
        let Some(index) = peer_ids.iter().position(|p| *p == self.peer_id) else {
            return Err(NetworkError::Setup(format!(
                "{} is not among the configured peers",
                self.peer_id
            )));
        };

        let endpoint = self
            .network
            .endpoint(config_digest, OracleId(index as u8), peer_ids.len());
        self.created.lock().push((config_digest, limits));
        self.endpoints.lock().push(Arc::clone(&endpoint));
        Ok(endpoint)
    }

    fn peer_id(&self) -> PeerId {
        self.peer_id.clone()
    }
}
