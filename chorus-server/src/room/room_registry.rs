use crate::relay::RelayHub;
use crate::room::Room;
use chorus_core::RoomId;
use dashmap::DashMap;
use std::fmt::Write;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

type RoomMap = DashMap<RoomId, Arc<Room>>;

/// Owns every room. Rooms are created lazily and only ever dropped by
/// [`RoomRegistry::reset`].
pub struct RoomRegistry {
    rooms: RwLock<Arc<RoomMap>>,
    relay: Option<RelayHub>,
}

impl RoomRegistry {
    /// `relay` enables server-relay mode for every room this registry creates.
    pub fn new(relay: Option<RelayHub>) -> Self {
        Self {
            rooms: RwLock::new(Arc::new(DashMap::new())),
            relay,
        }
    }

    /// Return the room for `room_id`, creating it on first reference. Racing
    /// callers always get the same instance.
    pub fn get_or_create(&self, room_id: &RoomId) -> Arc<Room> {
        let rooms = self.current();
        if let Some(room) = rooms.get(room_id) {
            return room.value().clone();
        }

        let room = rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!("Creating new room: {}", room_id);
                Arc::new(Room::new(room_id.clone(), self.relay.clone()))
            })
            .value()
            .clone();
        room
    }

    pub fn try_get(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        let rooms = self.current();
        let room = rooms.get(room_id).map(|room| room.value().clone());
        room
    }

    /// Drop every room at once. Returns how many rooms were discarded.
    pub fn reset(&self) -> usize {
        let previous = {
            let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *rooms, Arc::new(DashMap::new()))
        };

        let dropped = previous.len();
        warn!("Registry reset, {} room(s) discarded", dropped);
        dropped
    }

    pub fn room_count(&self) -> usize {
        self.current().len()
    }

    /// Rooms sorted by id.
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        let current = self.current();
        let mut rooms: Vec<Arc<Room>> = current
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rooms.sort_by(|a, b| a.id().cmp(b.id()));
        rooms
    }

    /// Human-readable summary for the status endpoint, one line per room
    /// with its member count and age in seconds.
    pub fn describe(&self) -> String {
        let rooms = self.rooms();
        let mut out = format!("Rooms: {}", rooms.len());
        for room in rooms {
            let age = room.created_at().elapsed().unwrap_or_default();
            let _ = write!(
                out,
                "\n{}: {} users, up {}s",
                room.id(),
                room.len(),
                age.as_secs()
            );
        }
        out
    }

    fn current(&self) -> Arc<RoomMap> {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
