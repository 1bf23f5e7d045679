use crate::app::AppState;
use axum::extract::State;
use tracing::warn;

pub async fn status_handler(State(state): State<AppState>) -> String {
    state.status_report()
}

pub async fn reset_handler(State(state): State<AppState>) -> &'static str {
    let dropped = state.router.reset();
    warn!("Reset requested over HTTP, {} room(s) dropped", dropped);
    "Reset."
}
