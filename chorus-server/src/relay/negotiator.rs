use crate::relay::relay_event::{RelayContext, RelayEvent};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One server-hosted media negotiation, as seen by the relay session.
///
/// Answers and local candidates are not returned from these calls; the
/// implementation pushes them onto the event channel it was created with.
#[async_trait]
pub trait Negotiator: Send + Sync {
    /// Apply the client's offer and start producing an answer.
    async fn set_remote_offer(&self, sdp: String) -> Result<()>;

    async fn add_remote_ice_candidate(&self, candidate: String) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Creates negotiators on demand. This is the engine's `Initialize` step.
#[async_trait]
pub trait NegotiatorFactory: Send + Sync + 'static {
    async fn initialize(
        &self,
        ctx: RelayContext,
        events: mpsc::Sender<RelayEvent>,
    ) -> Result<Box<dyn Negotiator>>;
}
