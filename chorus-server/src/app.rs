use crate::admin::{reset_handler, status_handler};
use crate::config::ServerConfig;
use crate::relay::{NegotiatorFactory, RelayEvent, RelayHub, WebRtcNegotiatorFactory};
use crate::room::RoomRegistry;
use crate::signaling::{SignalingRouter, SignalingService, ws_handler};
use axum::Router;
use axum::routing::get;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

/// Capacity of the channel relay sessions report answers and candidates on.
const RELAY_EVENT_BUFFER: usize = 256;

/// Shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub service: SignalingService,
    pub registry: Arc<RoomRegistry>,
    pub router: Arc<SignalingRouter>,
}

impl AppState {
    /// Wire up the server from its configuration. Must run inside a tokio
    /// runtime: the relay event dispatcher is spawned here.
    pub fn new(config: &ServerConfig) -> Self {
        let factory: Option<Arc<dyn NegotiatorFactory>> = if config.relay_enabled() {
            Some(Arc::new(WebRtcNegotiatorFactory::new(config.relay_config())))
        } else {
            None
        };
        Self::with_factory(SignalingService::new(config.ice_server_configs()), factory)
    }

    /// Same as [`AppState::new`] with an explicit negotiation engine. `None`
    /// disables server relay.
    pub fn with_factory(
        service: SignalingService,
        factory: Option<Arc<dyn NegotiatorFactory>>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel::<RelayEvent>(RELAY_EVENT_BUFFER);

        let relay = factory.map(|factory| RelayHub::new(factory, events_tx));
        info!(
            "Server relay {}",
            if relay.is_some() { "enabled" } else { "disabled" }
        );

        let registry = Arc::new(RoomRegistry::new(relay));
        let router = Arc::new(SignalingRouter::new(
            registry.clone(),
            Arc::new(service.clone()),
        ));

        tokio::spawn(router.clone().run_relay_events(events_rx));

        Self {
            service,
            registry,
            router,
        }
    }

    /// Body of `GET /status`.
    pub fn status_report(&self) -> String {
        format!(
            "Total clients connected: {}\n{}",
            self.service.connected_count(),
            self.registry.describe()
        )
    }
}

pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/hub", get(ws_handler))
        .route("/status", get(status_handler))
        .route("/reset", get(reset_handler));

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.layer(cors).with_state(state)
}
