//! Wire protocol for Bombfield.
//!
//! This crate defines what clients and servers say to each other:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`RoomId`],
//!   [`SessionId`]) — the action-tagged records on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how records become bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! ```text
//! Transport (frames) → Protocol (records) → Session manager (identities, rooms)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, RoomId, ServerMessage, SessionId};
