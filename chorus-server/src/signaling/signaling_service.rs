use crate::error::{Result, SignalingError};
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use chorus_core::{ConnectionId, IceServerConfig, ServerMessage};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

struct SignalingInner {
    peers: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Live transport sessions, keyed by connection id.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_peer(&self, cid: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(cid, tx);
    }

    pub fn remove_peer(&self, cid: &ConnectionId) {
        self.inner.peers.remove(cid);
    }

    /// Number of open transport connections, whether or not they joined a room.
    pub fn connected_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn send_signal(&self, cid: &ConnectionId, msg: &ServerMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;

        let Some(peer) = self.inner.peers.get(cid) else {
            warn!("Attempted to send signal to disconnected user {}", cid);
            return Err(SignalingError::UnknownConnection(cid.clone()));
        };
        peer.send(Message::Text(json.into()))
            .map_err(|_| SignalingError::ConnectionClosed(cid.clone()))
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send(&self, cid: &ConnectionId, msg: ServerMessage) -> Result<()> {
        self.send_signal(cid, &msg)
    }
}
