//! Static block layout.

use crate::Position;

/// Block positions for a `width` x `height` board: a solid border plus a
/// grid of interior pillars.
///
/// Every border cell appears exactly once. Pillars sit on every second
/// column starting at `x = 2` and every fourth row starting at `y = 2`,
/// stopping three cells short of the far edges.
pub fn standard_blocks(width: u32, height: u32) -> Vec<Position> {
    let (w, h) = (width as i32, height as i32);
    if w <= 0 || h <= 0 {
        return Vec::new();
    }

    let mut blocks = Vec::new();
    for x in 0..w {
        blocks.push(Position::new(x, 0));
        if h > 1 {
            blocks.push(Position::new(x, h - 1));
        }
    }
    for y in 1..h - 1 {
        blocks.push(Position::new(0, y));
        if w > 1 {
            blocks.push(Position::new(w - 1, y));
        }
    }
    for y in (2..h - 3).step_by(4) {
        for x in (2..w - 3).step_by(2) {
            blocks.push(Position::new(x, y));
        }
    }
    blocks
}
