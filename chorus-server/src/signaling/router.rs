use crate::error::{Result, SignalingError};
use crate::relay::RelayEvent;
use crate::room::{Room, RoomRegistry, RosterSnapshot};
use crate::signaling::SignalingOutput;
use chorus_core::{
    ClientMessage, ConnectionId, RoomId, ServerMessage, SignalEnvelope, SignalKind, TelemetryEvent,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Protocol-facing entry point. Every inbound client operation lands here;
/// membership lives in the registry, delivery goes through `output`.
pub struct SignalingRouter {
    registry: Arc<RoomRegistry>,
    output: Arc<dyn SignalingOutput>,
    /// Room each connection currently belongs to, used on disconnect.
    associations: DashMap<ConnectionId, RoomId>,
}

impl SignalingRouter {
    pub fn new(registry: Arc<RoomRegistry>, output: Arc<dyn SignalingOutput>) -> Self {
        Self {
            registry,
            output,
            associations: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Room `cid` is associated with, if any.
    pub fn room_of(&self, cid: &ConnectionId) -> Option<RoomId> {
        self.associations.get(cid).map(|room| room.value().clone())
    }

    /// Forget every room and every association. Returns the number of rooms
    /// dropped.
    pub fn reset(&self) -> usize {
        self.associations.clear();
        self.registry.reset()
    }

    /// Dispatch one parsed frame from `cid`.
    pub async fn handle_message(&self, cid: &ConnectionId, msg: ClientMessage) {
        match msg {
            ClientMessage::JoinEvent { room_id } => self.join(&room_id, cid).await,
            ClientMessage::LeaveEvent { room_id } => self.leave(&room_id, cid).await,
            ClientMessage::StartMedia { room_id } => {
                self.propose_media(&room_id, cid).await;
            }
            ClientMessage::SendChatMsg { room_id, text } => {
                self.route_chat(&room_id, cid, text).await
            }
            ClientMessage::ClientTelemetry(event) => self.telemetry(cid, &event),
            signal @ (ClientMessage::SendSdp { .. } | ClientMessage::SendIce { .. }) => {
                if let Some(envelope) = signal.into_envelope() {
                    self.route_signal(cid, envelope).await;
                }
            }
        }
    }

    #[instrument(skip_all, fields(room = %room_id, cid = %cid))]
    pub async fn join(&self, room_id: &RoomId, cid: &ConnectionId) {
        debug!("User joining");

        let previous = self.associations.insert(cid.clone(), room_id.clone());
        if let Some(previous) = previous.filter(|prev| prev != room_id) {
            info!(%previous, "Leaving previous room first");
            self.remove_from_room(&previous, cid).await;
        }

        let room = self.registry.get_or_create(room_id);
        let snapshot = room.add_member(cid.clone());
        self.publish_roster(&room, snapshot).await;

        info!("User joined");
    }

    #[instrument(skip_all, fields(room = %room_id, cid = %cid))]
    pub async fn leave(&self, room_id: &RoomId, cid: &ConnectionId) {
        debug!("User leaving");

        self.associations.remove_if(cid, |_, room| room == room_id);
        self.remove_from_room(room_id, cid).await;

        info!("User left");
    }

    /// Transport reported the connection gone; leave whatever room it was in.
    #[instrument(skip_all, fields(cid = %cid))]
    pub async fn disconnect(&self, cid: &ConnectionId) {
        let Some((_, room_id)) = self.associations.remove(cid) else {
            debug!("Disconnected without joining a room");
            return;
        };

        info!(room = %room_id, "Connection dropped, removing from room");
        self.remove_from_room(&room_id, cid).await;
    }

    /// Tell `cid` which members to open direct connections to.
    #[instrument(skip_all, fields(room = %room_id, cid = %cid))]
    pub async fn propose_media(&self, room_id: &RoomId, cid: &ConnectionId) -> Vec<ConnectionId> {
        let connections = self
            .registry
            .try_get(room_id)
            .map(|room| room.propose_connections(cid))
            .unwrap_or_default();

        info!(
            "User started media and will connect to: {}",
            join_ids(&connections)
        );

        let msg = ServerMessage::ConnectTo {
            connections: connections.clone(),
        };
        if let Err(e) = self.output.send(cid, msg).await {
            warn!("Failed to deliver connection proposal: {}", e);
        }
        connections
    }

    #[instrument(skip_all, fields(room = %room_id, cid = %cid, len = text.len()))]
    pub async fn route_chat(&self, room_id: &RoomId, cid: &ConnectionId, text: String) {
        let members = self
            .registry
            .try_get(room_id)
            .map(|room| room.members())
            .unwrap_or_default();

        debug!("Broadcasting chat message to {} member(s)", members.len());

        let msg = ServerMessage::ChatMsgReceived {
            from: cid.clone(),
            timestamp: unix_millis(),
            text,
        };
        self.broadcast(&members, msg).await;
    }

    /// Forward a negotiation payload to a peer, or into the sender's relay
    /// session when addressed to the server.
    #[instrument(
        skip_all,
        fields(room = %envelope.room_id, cid = %sender, from = %envelope.from, to = %envelope.to)
    )]
    pub async fn route_signal(&self, sender: &ConnectionId, envelope: SignalEnvelope) {
        debug!("Routing {:?}", envelope.kind);

        let result = if envelope.is_for_server() {
            self.deliver_to_relay(&envelope)
        } else {
            self.output
                .send(&envelope.to, envelope.to_server_message())
                .await
        };

        if let Err(e) = result {
            match e {
                SignalingError::RelayUnavailable { .. } => error!("{}", e),
                _ => warn!("Signal dropped: {}", e),
            }
        }
    }

    pub fn telemetry(&self, cid: &ConnectionId, event: &TelemetryEvent) {
        info!(
            room = event.eid.as_deref().unwrap_or_default(),
            %cid,
            "User sent telemetry event: {}, Success: {}, UA: {}, Msg: {}",
            event.name,
            event.success,
            event.user_agent.as_deref().unwrap_or_default(),
            event.message.as_deref().unwrap_or_default()
        );
    }

    /// Consume answers and candidates produced by relay sessions until every
    /// sender is gone.
    pub async fn run_relay_events(self: Arc<Self>, mut events: mpsc::Receiver<RelayEvent>) {
        info!("Relay event dispatch started");

        while let Some(event) = events.recv().await {
            self.handle_relay_event(event).await;
        }

        info!("Relay event dispatch finished");
    }

    pub async fn handle_relay_event(&self, event: RelayEvent) {
        match event {
            RelayEvent::AnswerReady(ctx, sdp) => {
                if let Err(e) = self.output.send_answer(&ctx.cid, sdp).await {
                    error!(room = %ctx.room_id, cid = %ctx.cid, "Failed sending SDP answer: {}", e);
                }
            }
            RelayEvent::IceReady(ctx, candidate) => {
                if let Err(e) = self.output.send_ice(&ctx.cid, candidate).await {
                    error!(room = %ctx.room_id, cid = %ctx.cid, "Failed sending ICE candidate: {}", e);
                }
            }
            RelayEvent::StateChanged(ctx, state) => {
                debug!(room = %ctx.room_id, cid = %ctx.cid, "Relay state: {}", state);
            }
            RelayEvent::Failed(ctx, reason) => {
                error!(room = %ctx.room_id, cid = %ctx.cid, "Relay negotiation failed: {}", reason);
            }
        }
    }

    /// An offer provisions the sender's session on first use; candidates only
    /// reach a session that already exists.
    fn deliver_to_relay(&self, envelope: &SignalEnvelope) -> Result<()> {
        let room = self.registry.get_or_create(&envelope.room_id);
        let session = match envelope.kind {
            SignalKind::Sdp => room.ensure_relay_session(&envelope.from),
            SignalKind::IceCandidate => room.relay_session(&envelope.from),
        };
        let Some(session) = session else {
            return Err(SignalingError::RelayUnavailable {
                room_id: envelope.room_id.clone(),
                cid: envelope.from.clone(),
            });
        };

        match envelope.kind {
            SignalKind::Sdp => session.submit_offer(envelope.payload.clone()),
            SignalKind::IceCandidate => session.submit_ice(envelope.payload.clone()),
        }
    }

    async fn remove_from_room(&self, room_id: &RoomId, cid: &ConnectionId) {
        let Some(room) = self.registry.try_get(room_id) else {
            debug!(room = %room_id, "Room no longer exists");
            return;
        };

        let snapshot = room.remove_member(cid);
        self.publish_roster(&room, snapshot).await;
    }

    /// Send `snapshot` to its members unless a newer roster of this room has
    /// already gone out.
    async fn publish_roster(&self, room: &Room, snapshot: RosterSnapshot) {
        let mut published = room.publish_gate().await;
        if snapshot.version < *published {
            debug!(
                version = snapshot.version,
                latest = *published,
                "Skipping superseded roster"
            );
            return;
        }
        *published = snapshot.version;

        let msg = ServerMessage::RosterUpdateReceived {
            roster: snapshot.members.clone(),
        };
        self.broadcast(&snapshot.members, msg).await;
    }

    async fn broadcast(&self, targets: &[ConnectionId], msg: ServerMessage) {
        for target in targets {
            if let Err(e) = self.output.send(target, msg.clone()).await {
                warn!(%target, "Broadcast delivery failed: {}", e);
            }
        }
    }
}

fn join_ids(ids: &[ConnectionId]) -> String {
    ids.iter()
        .map(ConnectionId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
