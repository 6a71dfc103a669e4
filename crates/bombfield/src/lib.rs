//! # Bombfield
//!
//! An authoritative server for two-player Bomberman-style matches played
//! over WebSocket.
//!
//! Clients pick a nickname, join a room by id and send key presses. Each
//! room seats two players, runs the match at a fixed tick rate and streams
//! a rendered board to both of them every tick until one player is left.
//!
//! ```text
//! WebSocket ─→ handler ─→ SessionManager ─→ room actor ─→ Game
//!     ↑                        │                 │
//!     └──── writer ←───────────┴──── RoomEvent ──┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bombfield::prelude::*;
//!
//! # async fn start() -> Result<(), BombfieldError> {
//! bombfield::init_tracing();
//! let server = BombfieldServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod manager;
mod server;

pub use error::BombfieldError;
pub use manager::{ConnectionTable, SessionEvent, SessionEventSender, SessionManager};
pub use server::{BombfieldServer, BombfieldServerBuilder, ServerConfig};

pub use bombfield_game as game;
pub use bombfield_protocol as protocol;
pub use bombfield_room as room;
pub use bombfield_session as session;
pub use bombfield_tick as tick;
pub use bombfield_transport as transport;

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Calling it more than once is harmless; only the first call installs.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{BombfieldError, BombfieldServer, BombfieldServerBuilder, ServerConfig};
    pub use bombfield_game::{GameConfig, Position, RayLengths};
    pub use bombfield_protocol::{ClientMessage, RoomId, ServerMessage, SessionId};
    pub use bombfield_room::{RoomConfig, RoomState};
    pub use bombfield_session::SessionConfig;
    pub use bombfield_tick::TickConfig;
}
