//! The session registry: every client currently connected.
//!
//! It answers three questions for the session manager:
//! - who is connected (chat goes to all of them)
//! - what is each client called (game results, chat `who`)
//! - which room is each client in (input routing, room teardown)
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain `HashMap`, not a concurrent one. It is
//! owned by the session manager's dispatch task and never shared.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use bombfield_protocol::{RoomId, SessionId};

use crate::{Session, SessionConfig, SessionError};

/// Membership-only registry of connected clients.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ set_nickname() / set_room() ... ──→ unregister()
///                        │
///                        ▼
///                 clear_room() when the room is deleted
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    config: SessionConfig,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    /// Records a newly accepted connection under the default nickname.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the id is taken.
    pub fn register(&mut self, id: SessionId) -> Result<&Session, SessionError> {
        match self.sessions.entry(id) {
            Entry::Occupied(_) => Err(SessionError::AlreadyConnected(id)),
            Entry::Vacant(slot) => {
                tracing::info!(session = %id, "session registered");
                Ok(slot.insert(Session::new(id, self.config.default_nickname.clone())))
            }
        }
    }

    /// Forgets a closed connection and returns its last known state, so the
    /// caller can take the client out of its room.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn unregister(&mut self, id: SessionId) -> Result<Session, SessionError> {
        let session = self.sessions.remove(&id).ok_or(SessionError::NotFound(id))?;
        tracing::info!(session = %id, nickname = %session.nickname, "session unregistered");
        Ok(session)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// The client's current nickname.
    pub fn nickname(&self, id: SessionId) -> Option<&str> {
        self.sessions.get(&id).map(|s| s.nickname.as_str())
    }

    /// The room the client is in, if any.
    pub fn room_of(&self, id: SessionId) -> Option<&RoomId> {
        self.sessions.get(&id).and_then(|s| s.room.as_ref())
    }

    pub fn set_nickname(
        &mut self,
        id: SessionId,
        nickname: impl Into<String>,
    ) -> Result<(), SessionError> {
        let session = self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.nickname = nickname.into();
        tracing::debug!(session = %id, nickname = %session.nickname, "nickname set");
        Ok(())
    }

    /// Moves the client into `room` (or out of any room with `None`).
    /// Returns the room it was in before.
    pub fn set_room(
        &mut self,
        id: SessionId,
        room: Option<RoomId>,
    ) -> Result<Option<RoomId>, SessionError> {
        let session = self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        Ok(std::mem::replace(&mut session.room, room))
    }

    /// Clears `room` off every member and returns who was affected.
    pub fn clear_room(&mut self, room: &RoomId) -> Vec<SessionId> {
        let mut cleared = Vec::new();
        for session in self.sessions.values_mut() {
            if session.is_in(room) {
                session.room = None;
                cleared.push(session.id);
            }
        }
        cleared.sort();
        cleared
    }

    /// Clients currently in `room`, in id order.
    pub fn members(&self, room: &RoomId) -> Vec<SessionId> {
        let mut members: Vec<_> = self
            .sessions
            .values()
            .filter(|s| s.is_in(room))
            .map(|s| s.id)
            .collect();
        members.sort();
        members
    }

    /// Every connected client, in id order.
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`, named
    //! `test_{function}_{scenario}_{expected}`.

    use super::*;

    fn sid(id: u64) -> SessionId {
        SessionId(id)
    }

    fn room(name: &str) -> RoomId {
        RoomId::new(name)
    }

    fn registry_with(ids: &[u64]) -> SessionRegistry {
        let mut reg = SessionRegistry::default();
        for id in ids {
            reg.register(sid(*id)).unwrap();
        }
        reg
    }

    // =====================================================================
    // register() / unregister()
    // =====================================================================

    #[test]
    fn test_register_new_session_gets_default_nickname() {
        let mut reg = SessionRegistry::default();
        let session = reg.register(sid(1)).unwrap();
        assert_eq!(session.nickname, "anonymous");
        assert_eq!(session.room, None);
    }

    #[test]
    fn test_register_uses_configured_default_nickname() {
        let mut reg = SessionRegistry::new(SessionConfig {
            default_nickname: "guest".into(),
        });
        assert_eq!(reg.register(sid(1)).unwrap().nickname, "guest");
    }

    #[test]
    fn test_register_twice_returns_already_connected() {
        let mut reg = registry_with(&[1]);
        assert_eq!(reg.register(sid(1)), Err(SessionError::AlreadyConnected(sid(1))));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_unregister_returns_last_state() {
        let mut reg = registry_with(&[1]);
        reg.set_nickname(sid(1), "A").unwrap();
        reg.set_room(sid(1), Some(room("5"))).unwrap();

        let session = reg.unregister(sid(1)).unwrap();

        assert_eq!(session.nickname, "A");
        assert_eq!(session.room, Some(room("5")));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unregister_unknown_returns_not_found() {
        let mut reg = SessionRegistry::default();
        assert_eq!(reg.unregister(sid(9)), Err(SessionError::NotFound(sid(9))));
    }

    // =====================================================================
    // nickname / room
    // =====================================================================

    #[test]
    fn test_set_nickname_unknown_returns_not_found() {
        let mut reg = SessionRegistry::default();
        assert_eq!(reg.set_nickname(sid(1), "A"), Err(SessionError::NotFound(sid(1))));
    }

    #[test]
    fn test_set_nickname_replaces_previous() {
        let mut reg = registry_with(&[1]);
        reg.set_nickname(sid(1), "A").unwrap();
        reg.set_nickname(sid(1), "Alpha").unwrap();
        assert_eq!(reg.nickname(sid(1)), Some("Alpha"));
    }

    #[test]
    fn test_set_room_returns_previous_room() {
        let mut reg = registry_with(&[1]);
        assert_eq!(reg.set_room(sid(1), Some(room("5"))).unwrap(), None);
        assert_eq!(reg.set_room(sid(1), None).unwrap(), Some(room("5")));
        assert_eq!(reg.room_of(sid(1)), None);
    }

    // =====================================================================
    // clear_room() / members()
    // =====================================================================

    #[test]
    fn test_clear_room_only_touches_members() {
        let mut reg = registry_with(&[1, 2, 3]);
        reg.set_room(sid(1), Some(room("5"))).unwrap();
        reg.set_room(sid(2), Some(room("5"))).unwrap();
        reg.set_room(sid(3), Some(room("7"))).unwrap();

        let cleared = reg.clear_room(&room("5"));

        assert_eq!(cleared, vec![sid(1), sid(2)]);
        assert_eq!(reg.room_of(sid(1)), None);
        assert_eq!(reg.room_of(sid(2)), None);
        assert_eq!(reg.room_of(sid(3)), Some(&room("7")));
    }

    #[test]
    fn test_clear_room_unknown_room_is_noop() {
        let mut reg = registry_with(&[1]);
        assert!(reg.clear_room(&room("nope")).is_empty());
    }

    #[test]
    fn test_members_lists_room_in_id_order() {
        let mut reg = registry_with(&[3, 1, 2]);
        reg.set_room(sid(3), Some(room("5"))).unwrap();
        reg.set_room(sid(1), Some(room("5"))).unwrap();
        assert_eq!(reg.members(&room("5")), vec![sid(1), sid(3)]);
    }

    #[test]
    fn test_ids_lists_everyone_in_order() {
        let reg = registry_with(&[2, 1]);
        assert_eq!(reg.ids(), vec![sid(1), sid(2)]);
    }
}
