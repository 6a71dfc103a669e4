//! Connected-client tracking for Bombfield.
//!
//! Each accepted connection becomes a [`Session`]: an id, a nickname and
//! the room the client is in. The [`SessionRegistry`] holds them all and is
//! owned by the server's session manager.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session manager (above)  ← routes input and chat using sessions
//!     ↕
//! Session layer (this crate)  ← who is connected, what they are called
//!     ↕
//! Protocol layer (below)  ← provides SessionId, RoomId
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{Session, SessionConfig};
