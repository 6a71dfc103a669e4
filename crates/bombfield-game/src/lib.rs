//! Board, objects and the per-tick simulation of a Bombfield match.
//!
//! ```text
//! Game ── owns ──► Vec<BoardObject> ── derived each tick ──► Board ──► snapshot
//!   ▲
//!   └─ on_player_key_press (queued, applied at the start of the next tick)
//! ```
//!
//! This crate does no I/O and never sleeps. The room actor decides when
//! [`Game::process_loop_once`] runs.

mod board;
mod config;
mod error;
mod game;
pub mod layout;
mod object;
mod position;

pub use board::{Board, Renderer, StringRenderer};
pub use config::{GameConfig, RayLengths};
pub use error::GameError;
pub use game::{Game, GamePhase};
pub use object::{
    Block, Bomb, BoardObject, Expiring, Flame, IdSequence, KeyAction, Lifetime, ObjectId,
    ObjectKind, Player, SpawnContext,
};
pub use position::{Direction, Position};
