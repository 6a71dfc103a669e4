//! Unified error type for the Bombfield server.

use bombfield_game::GameError;
use bombfield_protocol::ProtocolError;
use bombfield_room::RoomError;
use bombfield_session::SessionError;
use bombfield_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// Each variant is `#[from]`, so `?` converts sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum BombfieldError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown or duplicate session).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, started, unavailable).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A game could not be set up.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The session manager's dispatch task is gone.
    #[error("session manager stopped")]
    ManagerStopped,
}
