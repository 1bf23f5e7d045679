use crate::relay::{RelayContext, RelayHub, RelaySession};
use chorus_core::{ConnectionId, RoomId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Soft cap on full-mesh fan-out. At or above this size no direct
/// connections are proposed and clients fall back to server relay.
pub const MAX_CONNECTIONS: usize = 6;

/// Roster copy taken under the membership lock. `version` grows with every
/// membership change so stale snapshots can be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSnapshot {
    pub version: u64,
    pub members: Vec<ConnectionId>,
}

#[derive(Default)]
struct RoomState {
    /// Join order is kept; it is the order clients see in rosters.
    members: Vec<ConnectionId>,
    /// Keys are always a subset of `members`.
    relay_sessions: HashMap<ConnectionId, RelaySession>,
    version: u64,
}

impl RoomState {
    fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            version: self.version,
            members: self.members.clone(),
        }
    }
}

/// One logical event: its roster and the relay sessions of its members.
pub struct Room {
    id: RoomId,
    created_at: SystemTime,
    state: RwLock<RoomState>,
    relay: Option<RelayHub>,
    /// Version of the last roster handed to the transport.
    published: Mutex<u64>,
}

impl Room {
    pub fn new(id: RoomId, relay: Option<RelayHub>) -> Self {
        Self {
            id,
            created_at: SystemTime::now(),
            state: RwLock::new(RoomState::default()),
            relay,
            published: Mutex::new(0),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Add `cid` if absent.
    pub fn add_member(&self, cid: ConnectionId) -> RosterSnapshot {
        let mut state = self.write_state();
        if state.members.contains(&cid) {
            debug!(room = %self.id, %cid, "Already a member");
            return state.snapshot();
        }

        state.members.push(cid);
        state.version += 1;
        state.snapshot()
    }

    /// Remove `cid` if present and close its relay session.
    pub fn remove_member(&self, cid: &ConnectionId) -> RosterSnapshot {
        let (snapshot, session) = {
            let mut state = self.write_state();
            let Some(pos) = state.members.iter().position(|m| m == cid) else {
                return state.snapshot();
            };
            state.members.remove(pos);
            let session = state.relay_sessions.remove(cid);
            state.version += 1;
            (state.snapshot(), session)
        };

        if let Some(session) = session {
            session.close();
        }
        snapshot
    }

    pub fn members(&self) -> Vec<ConnectionId> {
        self.read_state().members.clone()
    }

    pub fn roster(&self) -> RosterSnapshot {
        self.read_state().snapshot()
    }

    pub fn len(&self) -> usize {
        self.read_state().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members `cid` should open direct connections to. Full mesh below
    /// [`MAX_CONNECTIONS`], nothing otherwise.
    pub fn propose_connections(&self, cid: &ConnectionId) -> Vec<ConnectionId> {
        let state = self.read_state();
        let size = state.members.len();
        if !(2..MAX_CONNECTIONS).contains(&size) {
            return Vec::new();
        }

        state
            .members
            .iter()
            .filter(|m| *m != cid)
            .cloned()
            .collect()
    }

    pub fn relay_session(&self, cid: &ConnectionId) -> Option<RelaySession> {
        self.read_state().relay_sessions.get(cid).cloned()
    }

    /// The member's relay session, provisioned on first use. `None` when
    /// relay mode is off or `cid` is not a member.
    pub fn ensure_relay_session(&self, cid: &ConnectionId) -> Option<RelaySession> {
        if let Some(session) = self.relay_session(cid) {
            return Some(session);
        }
        let relay = self.relay.as_ref()?;

        let mut state = self.write_state();
        if !state.members.contains(cid) {
            return None;
        }
        let session = state
            .relay_sessions
            .entry(cid.clone())
            .or_insert_with(|| {
                debug!(room = %self.id, %cid, "Provisioning relay session");
                relay.provision(RelayContext {
                    room_id: self.id.clone(),
                    cid: cid.clone(),
                })
            })
            .clone();
        Some(session)
    }

    /// Serializes roster publication. Holders compare their snapshot version
    /// against the guarded value and skip anything older.
    pub(crate) async fn publish_gate(&self) -> MutexGuard<'_, u64> {
        self.published.lock().await
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RoomState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RoomState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
