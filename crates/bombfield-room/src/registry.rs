//! Room registry: creates rooms on first reference and tracks their handles.

use std::collections::HashMap;

use bombfield_protocol::RoomId;

use crate::room::spawn_room;
use crate::{RoomConfig, RoomEventSender, RoomHandle};

/// All live rooms, keyed by the id clients chose for them.
///
/// Owned by the session manager's dispatch task. Rooms are created lazily
/// by [`RoomRegistry::get_or_create`] and removed when their match ends.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomHandle>,
    config: RoomConfig,
    /// Handed to every room actor this registry spawns.
    events: RoomEventSender,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig, events: RoomEventSender) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            events,
        }
    }

    /// Returns the room called `room_id`, spawning it if it doesn't exist.
    pub fn get_or_create(&mut self, room_id: &RoomId) -> &RoomHandle {
        self.rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!(%room_id, "room created");
            spawn_room(room_id.clone(), self.config.clone(), self.events.clone())
        })
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&RoomHandle> {
        self.rooms.get(room_id)
    }

    /// Forgets a room. The actor itself has already finished (or will,
    /// once its last handle is dropped).
    pub fn remove(&mut self, room_id: &RoomId) -> Option<RoomHandle> {
        let handle = self.rooms.remove(room_id)?;
        tracing::info!(%room_id, "room removed");
        Some(handle)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// All room ids, sorted.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<_> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }
}
