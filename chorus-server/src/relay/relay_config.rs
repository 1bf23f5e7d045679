use chorus_core::IceServerConfig;

/// Settings used to initialize server-side negotiation sessions.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub ice_servers: Vec<IceServerConfig>,
}
