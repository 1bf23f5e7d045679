use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

use chorus_core::ConnectionId;

/// Browser stand-in: offers one audio track's worth of media to the server.
pub struct TestClient {
    pub cid: ConnectionId,
    peer_connection: Arc<RTCPeerConnection>,
    connection_state: Arc<Mutex<RTCPeerConnectionState>>,
    /// Local candidates, JSON encoded the way browsers send them.
    ice_candidates: Arc<Mutex<Vec<String>>>,
}

impl TestClient {
    /// Create a new TestClient with no ICE servers (host candidates only).
    pub async fn new(cid: ConnectionId) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let peer_connection = Arc::new(api.new_peer_connection(RTCConfiguration::default()).await?);

        let connection_state = Arc::new(Mutex::new(RTCPeerConnectionState::New));
        let ice_candidates = Arc::new(Mutex::new(Vec::new()));

        let state_clone = Arc::clone(&connection_state);
        peer_connection.on_peer_connection_state_change(Box::new(move |state| {
            let state_clone = Arc::clone(&state_clone);
            Box::pin(async move {
                tracing::debug!("[TestClient] Connection state: {:?}", state);
                *state_clone.lock().await = state;
            })
        }));

        let ice_candidates_clone = Arc::clone(&ice_candidates);
        peer_connection.on_ice_candidate(Box::new(move |candidate| {
            let ice_candidates = Arc::clone(&ice_candidates_clone);
            Box::pin(async move {
                let Some(c) = candidate else { return };
                if let Ok(json) = c.to_json() {
                    if let Ok(s) = serde_json::to_string(&json) {
                        tracing::debug!("[TestClient] ICE candidate generated");
                        ice_candidates.lock().await.push(s);
                    }
                }
            })
        }));

        Ok(Self {
            cid,
            peer_connection,
            connection_state,
            ice_candidates,
        })
    }

    /// Create an SDP offer with a receive/send audio transceiver.
    ///
    /// Returns the SDP offer string to be sent to the server.
    pub async fn create_offer(&self) -> Result<String> {
        self.peer_connection
            .add_transceiver_from_kind(RTPCodecType::Audio, None)
            .await
            .context("Failed to add audio transceiver")?;

        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;

        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .context("Failed to set local description")?;

        Ok(offer.sdp)
    }

    /// Wait for ICE gathering to complete and return all candidates.
    pub async fn gather_ice_candidates(&self, timeout_ms: u64) -> Result<Vec<String>> {
        let mut gathering_complete = self.peer_connection.gathering_complete_promise().await;

        let timeout_result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            gathering_complete.recv(),
        )
        .await;

        let candidates = self.ice_candidates.lock().await.clone();
        if timeout_result.is_err() {
            tracing::warn!(
                "[TestClient] ICE gathering timeout, returning {} candidates",
                candidates.len()
            );
        }
        Ok(candidates)
    }

    /// Set the remote SDP answer received from the server.
    pub async fn set_remote_answer(&self, sdp: String) -> Result<()> {
        let answer = RTCSessionDescription::answer(sdp)?;
        self.peer_connection
            .set_remote_description(answer)
            .await
            .context("Failed to set remote description")?;
        Ok(())
    }

    /// Add a remote ICE candidate received from the server.
    pub async fn add_ice_candidate(&self, candidate_json: String) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_str(&candidate_json).context("Failed to parse ICE candidate")?;
        self.peer_connection
            .add_ice_candidate(candidate)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    pub async fn has_remote_answer(&self) -> bool {
        self.peer_connection.remote_description().await.is_some()
    }

    pub async fn connection_state(&self) -> RTCPeerConnectionState {
        *self.connection_state.lock().await
    }

    /// Close the peer connection.
    pub async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .context("Failed to close peer connection")?;
        Ok(())
    }
}
