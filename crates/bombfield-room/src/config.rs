//! Room configuration and state machine.

use std::time::Duration;

use bombfield_game::GameConfig;
use bombfield_tick::TickConfig;
use serde::{Deserialize, Serialize};

use crate::RoomError;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for every room the server creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Seats per room. The match starts when the last one is taken.
    pub capacity: usize,

    /// Pause between `gameprelude` and `gamestart`.
    pub grace_delay: Duration,

    /// Command channel size of each room actor.
    pub channel_size: usize,

    /// Tick pacing for the match.
    pub tick: TickConfig,

    /// Match rules.
    pub game: GameConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            capacity: 2,
            grace_delay: Duration::from_secs(3),
            channel_size: 64,
            tick: TickConfig::default(),
            game: GameConfig::default(),
        }
    }
}

impl RoomConfig {
    /// Seats in a room. A match is always one against one.
    pub const MAX_PLAYERS: usize = 2;

    /// Checks that the room can actually host its match.
    ///
    /// # Errors
    /// [`RoomError::InvalidCapacity`] unless `capacity` is
    /// [`MAX_PLAYERS`](Self::MAX_PLAYERS), and
    /// [`RoomError::NotEnoughSpawns`] if the game has fewer spawn points
    /// than seats.
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.capacity != Self::MAX_PLAYERS {
            return Err(RoomError::InvalidCapacity(self.capacity));
        }
        let spawns = self.game.spawn_points().len();
        if spawns < self.capacity {
            return Err(RoomError::NotEnoughSpawns {
                capacity: self.capacity,
                spawns,
            });
        }
        Ok(())
    }

    /// Seats actually offered: `capacity`, capped at
    /// [`MAX_PLAYERS`](Self::MAX_PLAYERS).
    pub fn seats(&self) -> usize {
        self.capacity.clamp(1, Self::MAX_PLAYERS)
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The published state of a room.
///
/// ```text
/// NotStarted ──(grace delay over)──→ Running ──(one survivor)──→ Ended
///                                       │
///                                       └──(a player leaves)──→ NotStarted
/// ```
///
/// Input is only forwarded to the game while the room is `Running`. A
/// player leaving mid-match drops the room back to `NotStarted`, which
/// stops input for everyone; the match itself keeps ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    NotStarted,
    Running,
    Ended,
}

impl RoomState {
    /// Returns `true` if input should reach the game.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NotStarted"),
            Self::Running => write!(f, "Running"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}
