use chorus_core::{ConnectionId, RoomId};

/// Identifies which member a relay session negotiates for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayContext {
    pub room_id: RoomId,
    pub cid: ConnectionId,
}

/// Events a negotiation engine pushes back to the router.
#[derive(Debug)]
pub enum RelayEvent {
    /// Local SDP answer is ready to be delivered to the client.
    AnswerReady(RelayContext, String),

    /// A local ICE candidate (JSON encoded) was gathered.
    IceReady(RelayContext, String),

    /// Peer connection state changed. Informational only.
    StateChanged(RelayContext, String),

    /// Negotiation failed for this member.
    Failed(RelayContext, String),
}

impl RelayEvent {
    pub fn context(&self) -> &RelayContext {
        match self {
            RelayEvent::AnswerReady(ctx, _)
            | RelayEvent::IceReady(ctx, _)
            | RelayEvent::StateChanged(ctx, _)
            | RelayEvent::Failed(ctx, _) => ctx,
        }
    }
}
