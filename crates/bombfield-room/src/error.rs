//! Error types for the room layer.

use bombfield_protocol::{RoomId, SessionId};

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Every seat is taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The match has already started; the room takes no more players,
    /// even into a vacated seat.
    #[error("room {0} has already started")]
    AlreadyStarted(RoomId),

    /// The session already holds a seat here.
    #[error("session {0} already seated in room {1}")]
    AlreadySeated(SessionId, RoomId),

    /// The session holds no seat here.
    #[error("session {0} not seated in room {1}")]
    NotSeated(SessionId, RoomId),

    /// Rooms seat exactly two players.
    #[error("room capacity {0} is not supported (rooms seat exactly 2)")]
    InvalidCapacity(usize),

    /// The game has fewer spawn points than the room has seats.
    #[error("{capacity} seats but only {spawns} spawn points")]
    NotEnoughSpawns { capacity: usize, spawns: usize },

    /// The room's command channel is closed: the room has finished.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
