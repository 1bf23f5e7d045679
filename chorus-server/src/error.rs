use chorus_core::{ConnectionId, RoomId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignalingError>;

/// Failures surfaced by the signaling layer. None of them are fatal: the
/// router logs them and carries on with the next request.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("no transport session for connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("outbound queue for connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    #[error("failed to serialize signal message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no relay session for {cid} in room {room_id}")]
    RelayUnavailable { room_id: RoomId, cid: ConnectionId },

    #[error("relay session for {0} has shut down")]
    RelayClosed(ConnectionId),

    #[error("relay session for {0} has too many pending commands")]
    RelayBusy(ConnectionId),
}
