//! Match configuration.

use serde::{Deserialize, Serialize};

use crate::Position;

/// Flame ray length per direction, counted from the bomb's own cell.
///
/// A length of 5 covers the bomb cell plus four cells beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RayLengths {
    pub up: u32,
    pub down: u32,
    pub left: u32,
    pub right: u32,
}

impl Default for RayLengths {
    fn default() -> Self {
        Self {
            up: 5,
            down: 5,
            left: 10,
            right: 10,
        }
    }
}

/// Rules for one match. All timers are counted in ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Board width in cells, border included.
    pub width: u32,
    /// Board height in cells, border included.
    pub height: u32,
    /// Ticks between planting a bomb and its detonation.
    pub bomb_fuse_ticks: u32,
    /// Ticks a flame stays on the board.
    pub flame_lifetime_ticks: u32,
    /// Flame ray lengths of a detonating bomb.
    pub rays: RayLengths,
    /// Spawn point per player slot. Empty means the two opposite inner
    /// corners, `(1, 1)` and `(width - 2, height - 2)`.
    pub spawns: Vec<Position>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            bomb_fuse_ticks: 90,
            flame_lifetime_ticks: 50,
            rays: RayLengths::default(),
            spawns: Vec::new(),
        }
    }
}

impl GameConfig {
    /// Default rules on a board of the given size.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Spawn points in slot order.
    pub fn spawn_points(&self) -> Vec<Position> {
        if !self.spawns.is_empty() {
            return self.spawns.clone();
        }
        let (w, h) = (self.width as i32, self.height as i32);
        vec![Position::new(1, 1), Position::new(w - 2, h - 2)]
    }
}
