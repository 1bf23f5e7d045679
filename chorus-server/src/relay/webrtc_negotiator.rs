use crate::relay::negotiator::{Negotiator, NegotiatorFactory};
use crate::relay::relay_config::RelayConfig;
use crate::relay::relay_event::{RelayContext, RelayEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_remote::TrackRemote;

/// Server-side leg of a relayed connection, backed by a `webrtc` peer
/// connection. Remote audio is received and drained; nothing is decoded.
pub struct WebRtcNegotiator {
    ctx: RelayContext,
    peer_connection: Arc<RTCPeerConnection>,
    events: mpsc::Sender<RelayEvent>,
}

impl WebRtcNegotiator {
    pub async fn new(
        ctx: RelayContext,
        config: &RelayConfig,
        events: mpsc::Sender<RelayEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = events.clone();
        let state_ctx = ctx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let ctx = state_ctx.clone();

                Box::pin(async move {
                    info!(room = %ctx.room_id, cid = %ctx.cid, "Relay peer connection state: {}", s);
                    let _ = tx.send(RelayEvent::StateChanged(ctx, s.to_string())).await;
                })
            },
        ));

        let ice_state_ctx = ctx.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                let ctx = ice_state_ctx.clone();
                Box::pin(async move {
                    info!(room = %ctx.room_id, cid = %ctx.cid, "Relay ICE state changed to {}", s);
                })
            },
        ));

        let ice_tx = events.clone();
        let ice_ctx = ctx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let ctx = ice_ctx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(json_candidate) = candidate.to_json() else {
                    return;
                };
                let Ok(str_candidate) = serde_json::to_string(&json_candidate) else {
                    return;
                };
                let _ = tx.send(RelayEvent::IceReady(ctx, str_candidate)).await;
            })
        }));

        let track_ctx = ctx.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>, _receiver: Arc<RTCRtpReceiver>, _transceiver: Arc<RTCRtpTransceiver>| {
                let ctx = track_ctx.clone();

                Box::pin(async move {
                    info!(
                        room = %ctx.room_id,
                        cid = %ctx.cid,
                        "Remote {} track received",
                        track.kind()
                    );
                    tokio::spawn(async move {
                        let mut packets = 0u64;
                        while track.read_rtp().await.is_ok() {
                            packets += 1;
                        }
                        debug!(room = %ctx.room_id, cid = %ctx.cid, packets, "Remote track ended");
                    });
                })
            },
        ));

        Ok(Self {
            ctx,
            peer_connection,
            events,
        })
    }
}

#[async_trait]
impl Negotiator for WebRtcNegotiator {
    async fn set_remote_offer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::offer(sdp).context("Malformed SDP offer")?;
        self.peer_connection.set_remote_description(desc).await?;

        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;

        self.events
            .send(RelayEvent::AnswerReady(self.ctx.clone(), answer.sdp))
            .await
            .context("Relay event channel closed")?;
        Ok(())
    }

    async fn add_remote_ice_candidate(&self, candidate_json: String) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_str(&candidate_json).context("Failed to parse ICE candidate JSON")?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Builds [`WebRtcNegotiator`]s with a shared ICE configuration.
pub struct WebRtcNegotiatorFactory {
    config: RelayConfig,
}

impl WebRtcNegotiatorFactory {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NegotiatorFactory for WebRtcNegotiatorFactory {
    async fn initialize(
        &self,
        ctx: RelayContext,
        events: mpsc::Sender<RelayEvent>,
    ) -> Result<Box<dyn Negotiator>> {
        let negotiator = WebRtcNegotiator::new(ctx, &self.config, events).await?;
        Ok(Box::new(negotiator))
    }
}
