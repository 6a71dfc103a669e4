//! Grid coordinates and movement directions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell on the board. `(0, 0)` is the top-left corner; `y` grows
/// downwards.
///
/// Coordinates are signed so that a move off the left or top edge yields a
/// negative position the board can reject, instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The position `steps` cells away in `direction`.
    pub fn step(self, direction: Direction, steps: i32) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx * steps, self.y + dy * steps)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// One of the four grid directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, in flame-ray order.
    pub const ALL: [Direction; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Unit offset `(dx, dy)`.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}
