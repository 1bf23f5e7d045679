use crate::relay::RelayConfig;
use chorus_core::IceServerConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Chorus signaling server
///
/// Coordinates peer-to-peer media sessions over a WebSocket hub and can
/// terminate negotiations itself when a room is too large for full mesh.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to
    #[arg(long, default_value = "0.0.0.0:5000", env = "CHORUS_BIND")]
    pub bind: SocketAddr,

    /// ICE server urls handed to clients and relay sessions (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_values = ["stun:stun.l.google.com:19302", "stun:turn2.l.google.com"],
        env = "CHORUS_ICE_SERVERS"
    )]
    pub ice_servers: Vec<String>,

    /// Username for TURN entries in --ice-servers
    #[arg(long, env = "CHORUS_TURN_USERNAME")]
    pub turn_username: Option<String>,

    /// Credential for TURN entries in --ice-servers
    #[arg(long, env = "CHORUS_TURN_CREDENTIAL")]
    pub turn_credential: Option<String>,

    /// Never terminate negotiations on the server
    #[arg(long, default_value_t = false, env = "CHORUS_NO_RELAY")]
    pub no_relay: bool,

    /// Serve a browser client from this directory
    #[arg(long, env = "CHORUS_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// All urls grouped into one ICE server entry. Credentials only travel
    /// when at least one url is a TURN url.
    pub fn ice_server_configs(&self) -> Vec<IceServerConfig> {
        if self.ice_servers.is_empty() {
            return Vec::new();
        }

        let has_turn = self
            .ice_servers
            .iter()
            .any(|url| url.starts_with("turn:") || url.starts_with("turns:"));

        vec![IceServerConfig {
            urls: self.ice_servers.clone(),
            username: self.turn_username.clone().filter(|_| has_turn),
            credential: self.turn_credential.clone().filter(|_| has_turn),
        }]
    }

    pub fn relay_enabled(&self) -> bool {
        !self.no_relay
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            ice_servers: self.ice_server_configs(),
        }
    }
}
