use anyhow::Context;
use chorus_server::{AppState, ServerConfig, app};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::parse();
    info!("Initializing signaling server...");

    let state = AppState::new(&config);
    let router = app(state, config.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("Signaling hub listening on ws://{}/hub", config.bind);

    axum::serve(listener, router)
        .await
        .context("server terminated")?;
    Ok(())
}
