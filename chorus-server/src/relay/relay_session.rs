use crate::error::{Result, SignalingError};
use crate::relay::negotiator::{Negotiator, NegotiatorFactory};
use crate::relay::relay_command::RelayCommand;
use crate::relay::relay_event::{RelayContext, RelayEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{Instrument, debug, info, info_span, warn};

/// Commands a session may have queued before new ones are refused.
pub const RELAY_COMMAND_BUFFER: usize = 100;

/// Everything a room needs to provision relay sessions for its members.
#[derive(Clone)]
pub struct RelayHub {
    factory: Arc<dyn NegotiatorFactory>,
    events: mpsc::Sender<RelayEvent>,
}

impl RelayHub {
    pub fn new(factory: Arc<dyn NegotiatorFactory>, events: mpsc::Sender<RelayEvent>) -> Self {
        Self { factory, events }
    }

    /// Allocate a session handle and start its task. The engine itself is
    /// initialized only when the first offer arrives.
    pub fn provision(&self, ctx: RelayContext) -> RelaySession {
        let (command_tx, command_rx) = mpsc::channel(RELAY_COMMAND_BUFFER);

        let task = RelaySessionTask {
            ctx: ctx.clone(),
            factory: self.factory.clone(),
            events: self.events.clone(),
            negotiator: None,
            command_rx,
        };
        let span = info_span!("relay", room = %ctx.room_id, cid = %ctx.cid);
        tokio::spawn(task.run().instrument(span));

        RelaySession { ctx, command_tx }
    }
}

/// Handle to a member's server-side negotiation. Cheap to clone; every call
/// returns immediately and the work happens on the session task in order.
/// Submissions beyond [`RELAY_COMMAND_BUFFER`] pending commands are refused.
#[derive(Clone, Debug)]
pub struct RelaySession {
    ctx: RelayContext,
    command_tx: mpsc::Sender<RelayCommand>,
}

impl RelaySession {
    pub fn context(&self) -> &RelayContext {
        &self.ctx
    }

    pub fn submit_offer(&self, sdp: String) -> Result<()> {
        self.submit(RelayCommand::RemoteOffer { sdp })
    }

    pub fn submit_ice(&self, candidate: String) -> Result<()> {
        self.submit(RelayCommand::RemoteIce { candidate })
    }

    /// Ask the task to release the engine. Safe to call more than once. If the
    /// queue is full the task still stops once the last handle is dropped.
    pub fn close(&self) {
        let _ = self.command_tx.try_send(RelayCommand::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    fn submit(&self, cmd: RelayCommand) -> Result<()> {
        self.command_tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => SignalingError::RelayBusy(self.ctx.cid.clone()),
            TrySendError::Closed(_) => SignalingError::RelayClosed(self.ctx.cid.clone()),
        })
    }
}

struct RelaySessionTask {
    ctx: RelayContext,
    factory: Arc<dyn NegotiatorFactory>,
    events: mpsc::Sender<RelayEvent>,
    negotiator: Option<Box<dyn Negotiator>>,
    command_rx: mpsc::Receiver<RelayCommand>,
}

impl RelaySessionTask {
    async fn run(mut self) {
        debug!("Relay session started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RelayCommand::RemoteOffer { sdp } => self.handle_offer(sdp).await,
                RelayCommand::RemoteIce { candidate } => self.handle_ice(candidate).await,
                RelayCommand::Close => break,
            }
        }

        if let Some(negotiator) = self.negotiator.take() {
            if let Err(e) = negotiator.close().await {
                warn!("Failed to close negotiator: {:?}", e);
            }
        }

        info!("Relay session finished");
    }

    async fn handle_offer(&mut self, sdp: String) {
        if self.negotiator.is_none() {
            match self
                .factory
                .initialize(self.ctx.clone(), self.events.clone())
                .await
            {
                Ok(negotiator) => self.negotiator = Some(negotiator),
                Err(e) => {
                    self.report_failure(format!("initialize failed: {e:#}")).await;
                    return;
                }
            }
        }

        let Some(negotiator) = &self.negotiator else {
            return;
        };
        if let Err(e) = negotiator.set_remote_offer(sdp).await {
            self.report_failure(format!("remote offer rejected: {e:#}"))
                .await;
        }
    }

    async fn handle_ice(&mut self, candidate: String) {
        let Some(negotiator) = &self.negotiator else {
            warn!("ICE candidate arrived before any offer, dropping it");
            return;
        };
        let Err(e) = negotiator.add_remote_ice_candidate(candidate).await else {
            return;
        };
        self.report_failure(format!("ICE candidate rejected: {e:#}"))
            .await;
    }

    async fn report_failure(&self, reason: String) {
        let _ = self
            .events
            .send(RelayEvent::Failed(self.ctx.clone(), reason))
            .await;
    }
}
