//! Session types: the server's record of one connected client.
//!
//! A session tracks:
//! - WHO the client is (`SessionId`, plus a display nickname)
//! - WHERE they are (the room they joined, if any)
//!
//! It deliberately holds no socket. The connection handler owns the socket
//! and the session manager reaches it through an outbound channel keyed by
//! the same `SessionId`.

use bombfield_protocol::{RoomId, SessionId};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Nickname a client has until it sends one of its own.
    ///
    /// Default: `"anonymous"`.
    pub default_nickname: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_nickname: "anonymous".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single connected client.
///
/// Created when the connection is accepted, dropped when it closes. There
/// is no reconnection: a new connection is a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,

    /// Display name used in game results and chat. Can change at any time,
    /// including mid-match (the game keeps the name it started with).
    pub nickname: String,

    /// The room this client joined, cleared when the room is deleted or
    /// the client leaves.
    pub room: Option<RoomId>,
}

impl Session {
    pub fn new(id: SessionId, nickname: impl Into<String>) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            room: None,
        }
    }

    /// `true` if this client is a member of `room`.
    pub fn is_in(&self, room: &RoomId) -> bool {
        self.room.as_ref() == Some(room)
    }
}
