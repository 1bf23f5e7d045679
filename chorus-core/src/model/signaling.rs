use crate::model::connection::ConnectionId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Opaque client-side diagnostics. Logged by the server, never acted on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub name: String,
    pub eid: Option<String>,
    pub cid: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub message: Option<String>,
}

/// Frames sent by a browser over the signaling socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    #[serde(rename = "joinEvent")]
    JoinEvent { room_id: RoomId },

    #[serde(rename = "leaveEvent")]
    LeaveEvent { room_id: RoomId },

    /// Ask the server which members to open direct connections to.
    #[serde(rename = "startMedia")]
    StartMedia { room_id: RoomId },

    #[serde(rename = "sendChatMsg")]
    SendChatMsg { room_id: RoomId, text: String },

    #[serde(rename = "sendSDP")]
    SendSdp {
        room_id: RoomId,
        from: ConnectionId,
        to: ConnectionId,
        sdp: String,
    },

    #[serde(rename = "sendICE")]
    SendIce {
        room_id: RoomId,
        from: ConnectionId,
        to: ConnectionId,
        candidate: String,
    },

    #[serde(rename = "clientTelemetry")]
    ClientTelemetry(TelemetryEvent),
}

/// Frames pushed by the server to a browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// First frame on every socket: the id the transport assigned and the
    /// ICE servers the client should use.
    #[serde(rename = "welcome")]
    Welcome {
        connection_id: ConnectionId,
        ice_servers: Vec<IceServerConfig>,
    },

    #[serde(rename = "rosterUpdateReceived")]
    RosterUpdateReceived { roster: Vec<ConnectionId> },

    #[serde(rename = "connectTo")]
    ConnectTo { connections: Vec<ConnectionId> },

    #[serde(rename = "chatMsgReceived")]
    ChatMsgReceived {
        from: ConnectionId,
        /// Unix time in milliseconds.
        timestamp: u64,
        text: String,
    },

    #[serde(rename = "sdpReceived")]
    SdpReceived { from: ConnectionId, sdp: String },

    #[serde(rename = "iceReceived")]
    IceReceived {
        from: ConnectionId,
        candidate: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Offer or answer. When addressed to the server it is always an offer.
    Sdp,
    IceCandidate,
}

/// A negotiation payload on its way from one connection to another, or to
/// the server when `to` is [`ConnectionId::server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEnvelope {
    pub room_id: RoomId,
    pub from: ConnectionId,
    pub to: ConnectionId,
    pub kind: SignalKind,
    pub payload: String,
}

impl SignalEnvelope {
    pub fn is_for_server(&self) -> bool {
        self.to.is_server()
    }

    /// The frame delivered to `to`, payload untouched.
    pub fn to_server_message(&self) -> ServerMessage {
        match self.kind {
            SignalKind::Sdp => ServerMessage::SdpReceived {
                from: self.from.clone(),
                sdp: self.payload.clone(),
            },
            SignalKind::IceCandidate => ServerMessage::IceReceived {
                from: self.from.clone(),
                candidate: self.payload.clone(),
            },
        }
    }
}

impl ClientMessage {
    /// Extract the negotiation envelope from `sendSDP`/`sendICE` frames.
    pub fn into_envelope(self) -> Option<SignalEnvelope> {
        match self {
            ClientMessage::SendSdp {
                room_id,
                from,
                to,
                sdp,
            } => Some(SignalEnvelope {
                room_id,
                from,
                to,
                kind: SignalKind::Sdp,
                payload: sdp,
            }),
            ClientMessage::SendIce {
                room_id,
                from,
                to,
                candidate,
            } => Some(SignalEnvelope {
                room_id,
                from,
                to,
                kind: SignalKind::IceCandidate,
                payload: candidate,
            }),
            _ => None,
        }
    }
}
