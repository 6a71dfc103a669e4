//! The occupancy grid.
//!
//! The board is *derived* state: the game clears it and re-adds every live
//! object each tick, so it never disagrees with the object list for long.
//! A cell holds the kinds of its occupants in insertion order; the first
//! entry decides what the renderer draws.

use std::fmt;

use crate::{BoardObject, ObjectKind, Position};

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Turns a board into something a client can display.
pub trait Renderer: Send + Sync {
    fn render(&self, board: &Board) -> String;
}

/// Fixed-glyph text renderer: one character per cell, rows joined by
/// newlines (every row, including the last, ends with `\n`).
#[derive(Debug, Clone, Copy, Default)]
pub struct StringRenderer;

impl StringRenderer {
    pub const EMPTY: char = ' ';
    pub const UNKNOWN: char = '?';

    pub fn glyph(kind: ObjectKind) -> char {
        match kind {
            ObjectKind::Player => 'O',
            ObjectKind::Block => '+',
            ObjectKind::Flame => '~',
            ObjectKind::Bomb => 'X',
        }
    }
}

impl Renderer for StringRenderer {
    fn render(&self, board: &Board) -> String {
        let mut out = String::with_capacity((board.width() as usize + 1) * board.height() as usize);
        for y in 0..board.height() as i32 {
            for x in 0..board.width() as i32 {
                let glyph = board
                    .get_tile_objects(Position::new(x, y))
                    .first()
                    .map_or(Self::EMPTY, |kind| Self::glyph(*kind));
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

pub struct Board {
    width: u32,
    height: u32,
    tiles: Vec<Vec<ObjectKind>>,
    renderer: Box<dyn Renderer>,
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("occupied_entries", &self.occupied_entries())
            .finish_non_exhaustive()
    }
}

impl Board {
    /// An empty board that renders with [`StringRenderer`].
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_renderer(width, height, StringRenderer)
    }

    pub fn with_renderer(width: u32, height: u32, renderer: impl Renderer + 'static) -> Self {
        Self {
            width,
            height,
            tiles: vec![Vec::new(); width as usize * height as usize],
            renderer: Box::new(renderer),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }

    fn index(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| position.y as usize * self.width as usize + position.x as usize)
    }

    /// Empties every cell.
    pub fn clear(&mut self) {
        self.tiles.iter_mut().for_each(Vec::clear);
    }

    /// Tags the object's cell with its kind. Removed or off-board objects
    /// are skipped.
    pub fn add_object(&mut self, object: &BoardObject) {
        let Some(idx) = object.position().and_then(|p| self.index(p)) else {
            return;
        };
        self.tiles[idx].push(object.kind());
    }

    /// Kinds present at `position`, in insertion order. Empty for cells
    /// outside the board.
    pub fn get_tile_objects(&self, position: Position) -> &[ObjectKind] {
        match self.index(position) {
            Some(idx) => &self.tiles[idx],
            None => &[],
        }
    }

    /// Total number of tags across all cells.
    pub fn occupied_entries(&self) -> usize {
        self.tiles.iter().map(Vec::len).sum()
    }

    pub fn render(&self) -> String {
        self.renderer.render(self)
    }
}
