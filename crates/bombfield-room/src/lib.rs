//! Rooms for Bombfield.
//!
//! Each room runs as an isolated Tokio task (actor model) that seats up to
//! two players, runs their match tick by tick, and reports everything the
//! players should see back to the session manager as [`RoomEvent`]s.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — creates rooms on first use, drops them when done
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomState`] — published state (not started / running / ended)
//! - [`RoomConfig`] — seats, grace delay, tick rate, match rules

mod config;
mod error;
mod registry;
mod room;

pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{RoomEvent, RoomEventSender, RoomHandle, RoomInfo};
