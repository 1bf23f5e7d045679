use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wire value addressing the server's own relay session instead of a peer.
const SERVER_ID: &str = "SRVCID";

/// Opaque identifier the transport assigns to one live client connection.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Issue a fresh identifier for a newly accepted connection.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The distinguished `SERVER` target.
    pub fn server() -> Self {
        Self(SERVER_ID.to_owned())
    }

    pub fn is_server(&self) -> bool {
        self.0 == SERVER_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
