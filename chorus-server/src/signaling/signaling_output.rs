use crate::error::Result;
use async_trait::async_trait;
use chorus_core::{ConnectionId, ServerMessage};

/// Outbound side of the transport: delivers one frame to one connection.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send(&self, cid: &ConnectionId, msg: ServerMessage) -> Result<()>;

    /// SDP answer produced by the server's relay session.
    async fn send_answer(&self, cid: &ConnectionId, sdp: String) -> Result<()> {
        let msg = ServerMessage::SdpReceived {
            from: ConnectionId::server(),
            sdp,
        };
        self.send(cid, msg).await
    }

    /// Local ICE candidate gathered by the server's relay session.
    async fn send_ice(&self, cid: &ConnectionId, candidate: String) -> Result<()> {
        let msg = ServerMessage::IceReceived {
            from: ConnectionId::server(),
            candidate,
        };
        self.send(cid, msg).await
    }
}
