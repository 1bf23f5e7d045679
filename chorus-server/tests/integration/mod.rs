pub mod room_tests;

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;

use chorus_core::{ConnectionId, RoomId};
use chorus_server::{NegotiatorFactory, RelayEvent, RelayHub, RoomRegistry, SignalingRouter};

use crate::utils::{MockSignalingOutput, Sent};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn cid(s: &str) -> ConnectionId {
    ConnectionId::from(s)
}

pub fn room(s: &str) -> RoomId {
    RoomId::new(s).expect("non-empty room id")
}

/// Router without server relay, wired to a recording output.
pub fn create_test_router() -> (
    Arc<SignalingRouter>,
    mpsc::UnboundedReceiver<Sent>,
    MockSignalingOutput,
) {
    let (output, signal_rx) = MockSignalingOutput::new();
    let registry = Arc::new(RoomRegistry::new(None));
    let router = Arc::new(SignalingRouter::new(registry, Arc::new(output.clone())));

    (router, signal_rx, output)
}

/// Router in relay mode using `factory`, with its event dispatcher running.
pub fn create_relay_router(
    factory: Arc<dyn NegotiatorFactory>,
) -> (
    Arc<SignalingRouter>,
    mpsc::UnboundedReceiver<Sent>,
    MockSignalingOutput,
) {
    let (output, signal_rx) = MockSignalingOutput::new();
    let (events_tx, events_rx) = mpsc::channel::<RelayEvent>(256);

    let registry = Arc::new(RoomRegistry::new(Some(RelayHub::new(factory, events_tx))));
    let router = Arc::new(SignalingRouter::new(registry, Arc::new(output.clone())));

    tokio::spawn(router.clone().run_relay_events(events_rx));

    (router, signal_rx, output)
}
