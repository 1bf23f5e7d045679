use async_trait::async_trait;
use chorus_core::{ConnectionId, ServerMessage};
use chorus_server::{SignalingError, SignalingOutput};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// One frame the router tried to deliver.
pub type Sent = (ConnectionId, ServerMessage);

/// Mock SignalingOutput that captures all outgoing frames.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to send captured frames.
    tx: mpsc::UnboundedSender<Sent>,
    /// All delivered frames (for verification).
    sent: Arc<Mutex<Vec<Sent>>>,
    /// Connections that behave as already gone.
    departed: Arc<Mutex<HashSet<ConnectionId>>>,
}

impl MockSignalingOutput {
    /// Create a new MockSignalingOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Sent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = Self {
            tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            departed: Arc::new(Mutex::new(HashSet::new())),
        };
        (output, rx)
    }

    /// Make every later send to `cid` fail as if its socket closed.
    pub async fn depart(&self, cid: &ConnectionId) {
        self.departed.lock().await.insert(cid.clone());
    }

    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    /// Frames delivered to `cid`, in order.
    pub async fn messages_for(&self, cid: &ConnectionId) -> Vec<ServerMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == cid)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// Last roster `cid` was told about.
    pub async fn last_roster_for(&self, cid: &ConnectionId) -> Option<Vec<ConnectionId>> {
        self.messages_for(cid)
            .await
            .into_iter()
            .rev()
            .find_map(|msg| match msg {
                ServerMessage::RosterUpdateReceived { roster } => Some(roster),
                _ => None,
            })
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn send(&self, cid: &ConnectionId, msg: ServerMessage) -> chorus_server::Result<()> {
        tracing::debug!("[MockSignaling] send to {}: {:?}", cid, msg);

        if self.departed.lock().await.contains(cid) {
            return Err(SignalingError::ConnectionClosed(cid.clone()));
        }

        self.sent.lock().await.push((cid.clone(), msg.clone()));
        let _ = self.tx.send((cid.clone(), msg));
        Ok(())
    }
}
