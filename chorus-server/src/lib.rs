pub mod admin;
pub mod app;
pub mod config;
pub mod error;
pub mod relay;
pub mod room;
pub mod signaling;

pub use app::{AppState, app};
pub use config::ServerConfig;
pub use error::{Result, SignalingError};
pub use relay::*;
pub use room::*;
pub use signaling::*;
