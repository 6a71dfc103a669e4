//! Error types for the session layer.

use bombfield_protocol::SessionId;

/// Errors that can occur while tracking connected clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given id: it was never registered, or the
    /// connection already closed.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// The id is already registered. Connection ids are never reused, so
    /// this points at a bug in whoever allocated the id.
    #[error("session {0} is already connected")]
    AlreadyConnected(SessionId),
}
