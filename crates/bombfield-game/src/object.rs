//! Everything that can sit on the board.
//!
//! Objects form a closed set ([`BoardObject`]). Each one knows its position
//! and how to advance by one tick; an update may *spawn* new objects (a
//! player plants a bomb, a bomb bursts into flames), which the game appends
//! to its live list after the update pass.
//!
//! Removal is two-phase: an object clears its own position, and the game
//! drops position-less objects during the next compaction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Board, Direction, GameConfig, Position};

// ---------------------------------------------------------------------------
// Kinds and ids
// ---------------------------------------------------------------------------

/// Type tag stored in board cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Block,
    Flame,
    Bomb,
    Player,
}

/// Per-game object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj-{}", self.0)
    }
}

/// Monotonic source of [`ObjectId`]s. Each game owns one.
#[derive(Debug, Default)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn next_id(&mut self) -> ObjectId {
        self.next += 1;
        ObjectId(self.next)
    }
}

/// What an update needs besides the object itself.
pub struct SpawnContext<'a> {
    pub ids: &'a mut IdSequence,
    pub config: &'a GameConfig,
}

// ---------------------------------------------------------------------------
// Countdowns
// ---------------------------------------------------------------------------

/// A countdown in ticks, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    remaining: u32,
}

impl Lifetime {
    pub fn new(ticks: u32) -> Self {
        Self { remaining: ticks }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Counts down one tick. Returns `true` once the countdown hits zero.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// Objects that disappear after a fixed number of ticks.
pub trait Expiring {
    fn lifetime_mut(&mut self) -> &mut Lifetime;

    /// Runs once, on the tick the countdown reaches zero.
    fn on_expire(&mut self, ctx: &mut SpawnContext<'_>) -> Vec<BoardObject>;

    fn count_down(&mut self, ctx: &mut SpawnContext<'_>) -> Vec<BoardObject> {
        if self.lifetime_mut().tick() {
            self.on_expire(ctx)
        } else {
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Static wall segment.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: ObjectId,
    position: Option<Position>,
}

impl Block {
    pub fn new(id: ObjectId, position: Position) -> Self {
        Self {
            id,
            position: Some(position),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Flame {
    pub id: ObjectId,
    position: Option<Position>,
    lifetime: Lifetime,
}

impl Flame {
    pub fn new(id: ObjectId, position: Position, lifetime_ticks: u32) -> Self {
        Self {
            id,
            position: Some(position),
            lifetime: Lifetime::new(lifetime_ticks),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.lifetime.remaining()
    }
}

impl Expiring for Flame {
    fn lifetime_mut(&mut self) -> &mut Lifetime {
        &mut self.lifetime
    }

    fn on_expire(&mut self, _ctx: &mut SpawnContext<'_>) -> Vec<BoardObject> {
        self.position = None;
        Vec::new()
    }
}

#[derive(Debug, Clone)]
pub struct Bomb {
    pub id: ObjectId,
    position: Option<Position>,
    fuse: Lifetime,
}

impl Bomb {
    pub fn new(id: ObjectId, position: Position, fuse_ticks: u32) -> Self {
        Self {
            id,
            position: Some(position),
            fuse: Lifetime::new(fuse_ticks),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.fuse.remaining()
    }

    /// Flames covering the four rays around `origin`, clipped to the board
    /// interior. Each ray includes `origin` itself.
    fn flames(origin: Position, ctx: &mut SpawnContext<'_>) -> Vec<BoardObject> {
        let config = ctx.config;
        let (w, h) = (config.width as i32, config.height as i32);
        let inside = |p: Position| p.x > 0 && p.x < w - 1 && p.y > 0 && p.y < h - 1;

        let mut flames = Vec::new();
        for direction in Direction::ALL {
            let length = match direction {
                Direction::Up => config.rays.up,
                Direction::Down => config.rays.down,
                Direction::Left => config.rays.left,
                Direction::Right => config.rays.right,
            };
            for offset in 0..length as i32 {
                let cell = origin.step(direction, offset);
                if inside(cell) {
                    flames.push(BoardObject::Flame(Flame::new(
                        ctx.ids.next_id(),
                        cell,
                        config.flame_lifetime_ticks,
                    )));
                }
            }
        }
        flames
    }
}

impl Expiring for Bomb {
    fn lifetime_mut(&mut self) -> &mut Lifetime {
        &mut self.fuse
    }

    fn on_expire(&mut self, ctx: &mut SpawnContext<'_>) -> Vec<BoardObject> {
        match self.position.take() {
            Some(origin) => Self::flames(origin, ctx),
            None => Vec::new(),
        }
    }
}

/// What a key press asks a player to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Move(Direction),
    PlantBomb,
}

impl KeyAction {
    /// Looks up a key name. Unknown names yield `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "up" => Some(Self::Move(Direction::Up)),
            "down" => Some(Self::Move(Direction::Down)),
            "left" => Some(Self::Move(Direction::Left)),
            "right" => Some(Self::Move(Direction::Right)),
            "x" => Some(Self::PlantBomb),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: ObjectId,
    nickname: String,
    position: Option<Position>,
    speed: (i32, i32),
    planting_bomb: bool,
}

impl Player {
    pub fn new(id: ObjectId, nickname: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            position: Some(position),
            speed: (1, 1),
            planting_bomb: false,
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn is_planting(&self) -> bool {
        self.planting_bomb
    }

    /// Tries to move one step. Returns `false` (and stays put) when the
    /// target is off the board or holds a block.
    pub fn move_towards(&mut self, direction: Direction, board: &Board) -> bool {
        let Some(current) = self.position else {
            return false;
        };
        let steps = match direction {
            Direction::Up | Direction::Down => self.speed.1,
            Direction::Left | Direction::Right => self.speed.0,
        };
        let target = current.step(direction, steps);
        if !board.contains(target) || board.get_tile_objects(target).contains(&ObjectKind::Block) {
            return false;
        }
        self.position = Some(target);
        true
    }

    /// Asks for a bomb on the player's next update.
    pub fn plant_bomb(&mut self) {
        self.planting_bomb = true;
    }

    pub fn apply(&mut self, action: KeyAction, board: &Board) {
        match action {
            KeyAction::Move(direction) => {
                self.move_towards(direction, board);
            }
            KeyAction::PlantBomb => self.plant_bomb(),
        }
    }

    fn update(&mut self, ctx: &mut SpawnContext<'_>) -> Vec<BoardObject> {
        if !std::mem::take(&mut self.planting_bomb) {
            return Vec::new();
        }
        match self.position {
            Some(at) => vec![BoardObject::Bomb(Bomb::new(
                ctx.ids.next_id(),
                at,
                ctx.config.bomb_fuse_ticks,
            ))],
            None => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// BoardObject
// ---------------------------------------------------------------------------

/// Any live object.
#[derive(Debug, Clone)]
pub enum BoardObject {
    Block(Block),
    Flame(Flame),
    Bomb(Bomb),
    Player(Player),
}

impl BoardObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Block(_) => ObjectKind::Block,
            Self::Flame(_) => ObjectKind::Flame,
            Self::Bomb(_) => ObjectKind::Bomb,
            Self::Player(_) => ObjectKind::Player,
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            Self::Block(b) => b.id,
            Self::Flame(f) => f.id,
            Self::Bomb(b) => b.id,
            Self::Player(p) => p.id,
        }
    }

    /// `None` once the object has been removed.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Block(b) => b.position,
            Self::Flame(f) => f.position,
            Self::Bomb(b) => b.position,
            Self::Player(p) => p.position,
        }
    }

    /// Clears the position; the object is purged at the next compaction.
    pub fn remove(&mut self) {
        match self {
            Self::Block(b) => b.position = None,
            Self::Flame(f) => f.position = None,
            Self::Bomb(b) => b.position = None,
            Self::Player(p) => p.position = None,
        }
    }

    /// Advances one tick and returns any objects spawned by it.
    pub fn update(&mut self, ctx: &mut SpawnContext<'_>) -> Vec<BoardObject> {
        match self {
            Self::Block(_) => Vec::new(),
            Self::Flame(f) => f.count_down(ctx),
            Self::Bomb(b) => b.count_down(ctx),
            Self::Player(p) => p.update(ctx),
        }
    }

    pub fn as_player(&self) -> Option<&Player> {
        match self {
            Self::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match self {
            Self::Player(p) => Some(p),
            _ => None,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::standard_blocks;

    fn bordered_board(width: u32, height: u32) -> Board {
        let mut board = Board::new(width, height);
        let mut ids = IdSequence::default();
        for at in standard_blocks(width, height) {
            board.add_object(&BoardObject::Block(Block::new(ids.next_id(), at)));
        }
        board
    }

    /// Runs `update` until something is spawned or `limit` ticks pass.
    /// Returns the tick (1-based) the spawn happened on.
    fn ticks_until_spawn(
        object: &mut BoardObject,
        config: &GameConfig,
        limit: u32,
    ) -> Option<(u32, Vec<BoardObject>)> {
        let mut ids = IdSequence::default();
        for tick in 1..=limit {
            let mut ctx = SpawnContext { ids: &mut ids, config };
            let spawned = object.update(&mut ctx);
            if !spawned.is_empty() {
                return Some((tick, spawned));
            }
        }
        None
    }

    // =====================================================================
    // Lifetime
    // =====================================================================

    #[test]
    fn test_lifetime_expires_after_exact_ticks() {
        let mut lifetime = Lifetime::new(3);
        assert!(!lifetime.tick());
        assert!(!lifetime.tick());
        assert!(lifetime.tick());
        assert_eq!(lifetime.remaining(), 0);
    }

    #[test]
    fn test_lifetime_zero_expires_on_first_tick() {
        assert!(Lifetime::new(0).tick());
    }

    // =====================================================================
    // Flame
    // =====================================================================

    #[test]
    fn test_flame_clears_position_after_lifetime() {
        let config = GameConfig::default();
        let mut ids = IdSequence::default();
        let mut flame = BoardObject::Flame(Flame::new(ObjectId(1), Position::new(2, 2), 4));

        for _ in 0..3 {
            let mut ctx = SpawnContext { ids: &mut ids, config: &config };
            assert!(flame.update(&mut ctx).is_empty());
            assert!(flame.position().is_some());
        }
        let mut ctx = SpawnContext { ids: &mut ids, config: &config };
        assert!(flame.update(&mut ctx).is_empty());
        assert_eq!(flame.position(), None);
    }

    // =====================================================================
    // Bomb
    // =====================================================================

    #[test]
    fn test_bomb_detonates_after_fuse_and_clears_itself() {
        let config = GameConfig::default();
        let mut bomb = BoardObject::Bomb(Bomb::new(ObjectId(1), Position::new(20, 10), 90));

        let (tick, _) = ticks_until_spawn(&mut bomb, &config, 200).unwrap();

        assert_eq!(tick, 90);
        assert_eq!(bomb.position(), None);
    }

    #[test]
    fn test_bomb_in_open_field_spawns_full_rays() {
        let config = GameConfig::default();
        let mut bomb = BoardObject::Bomb(Bomb::new(ObjectId(1), Position::new(20, 10), 1));

        let (_, flames) = ticks_until_spawn(&mut bomb, &config, 1).unwrap();

        assert_eq!(flames.len(), 5 + 5 + 10 + 10);
        assert!(flames.iter().all(|f| f.kind() == ObjectKind::Flame));
        let cells: Vec<_> = flames.iter().filter_map(BoardObject::position).collect();
        assert!(cells.contains(&Position::new(20, 6)));
        assert!(cells.contains(&Position::new(20, 14)));
        assert!(cells.contains(&Position::new(11, 10)));
        assert!(cells.contains(&Position::new(29, 10)));
        assert!(!cells.contains(&Position::new(20, 5)));
        assert!(!cells.contains(&Position::new(30, 10)));
    }

    #[test]
    fn test_bomb_next_to_edge_gets_unit_ray_towards_it() {
        let config = GameConfig::default();
        // One cell from the top-left border corner.
        let mut bomb = BoardObject::Bomb(Bomb::new(ObjectId(1), Position::new(1, 1), 1));

        let (_, flames) = ticks_until_spawn(&mut bomb, &config, 1).unwrap();

        // up: 1, left: 1, down: 5, right: 10
        assert_eq!(flames.len(), 1 + 1 + 5 + 10);
        assert!(flames.iter().all(|f| {
            let p = f.position().unwrap();
            p.x > 0 && p.y > 0
        }));
    }

    #[test]
    fn test_bomb_rays_pass_through_blocks() {
        let config = GameConfig::with_size(64, 32);
        // (2, 2) is a pillar; the bomb at (1, 2) still flames past it.
        let mut bomb = BoardObject::Bomb(Bomb::new(ObjectId(1), Position::new(1, 2), 1));

        let (_, flames) = ticks_until_spawn(&mut bomb, &config, 1).unwrap();

        let cells: Vec<_> = flames.iter().filter_map(BoardObject::position).collect();
        assert!(cells.contains(&Position::new(2, 2)));
        assert!(cells.contains(&Position::new(5, 2)));
    }

    #[test]
    fn test_bomb_flames_carry_configured_lifetime() {
        let config = GameConfig {
            flame_lifetime_ticks: 7,
            ..GameConfig::default()
        };
        let mut bomb = BoardObject::Bomb(Bomb::new(ObjectId(1), Position::new(10, 10), 1));

        let (_, flames) = ticks_until_spawn(&mut bomb, &config, 1).unwrap();

        for flame in flames {
            let BoardObject::Flame(flame) = flame else {
                panic!("expected a flame");
            };
            assert_eq!(flame.remaining(), 7);
        }
    }

    // =====================================================================
    // Player
    // =====================================================================

    #[test]
    fn test_key_action_table() {
        assert_eq!(KeyAction::from_key("up"), Some(KeyAction::Move(Direction::Up)));
        assert_eq!(KeyAction::from_key("x"), Some(KeyAction::PlantBomb));
        assert_eq!(KeyAction::from_key("space"), None);
        assert_eq!(KeyAction::from_key("UP"), None);
    }

    #[test]
    fn test_player_moves_into_free_cell() {
        let board = bordered_board(6, 6);
        let mut player = Player::new(ObjectId(1), "A", Position::new(2, 2));

        assert!(player.move_towards(Direction::Right, &board));
        assert_eq!(player.position, Some(Position::new(3, 2)));
    }

    #[test]
    fn test_player_never_enters_border_cells() {
        let board = bordered_board(6, 5);
        let (w, h) = (6, 5);

        // Stand on every inner cell next to the border and push outwards.
        for x in 1..w - 1 {
            for y in 1..h - 1 {
                for direction in Direction::ALL {
                    let start = Position::new(x, y);
                    let target = start.step(direction, 1);
                    let blocked = target.x == 0 || target.y == 0 || target.x == w - 1 || target.y == h - 1;
                    let mut player = Player::new(ObjectId(1), "A", start);

                    let moved = player.move_towards(direction, &board);

                    assert_eq!(moved, !blocked, "{start} -> {direction:?}");
                    let expected = if blocked { start } else { target };
                    assert_eq!(player.position, Some(expected));
                }
            }
        }
    }

    #[test]
    fn test_player_rejects_out_of_bounds_target() {
        // No blocks at all: only the bounds stop the player.
        let board = Board::new(3, 3);
        for (start, direction) in [
            (Position::new(0, 1), Direction::Left),
            (Position::new(2, 1), Direction::Right),
            (Position::new(1, 0), Direction::Up),
            (Position::new(1, 2), Direction::Down),
        ] {
            let mut player = Player::new(ObjectId(1), "A", start);
            assert!(!player.move_towards(direction, &board));
            assert_eq!(player.position, Some(start));
        }
    }

    #[test]
    fn test_player_walks_through_flames_and_bombs() {
        let mut board = bordered_board(6, 6);
        board.add_object(&BoardObject::Flame(Flame::new(ObjectId(90), Position::new(3, 2), 5)));
        board.add_object(&BoardObject::Bomb(Bomb::new(ObjectId(91), Position::new(4, 2), 5)));
        let mut player = Player::new(ObjectId(1), "A", Position::new(2, 2));

        assert!(player.move_towards(Direction::Right, &board));
        assert!(player.move_towards(Direction::Right, &board));
        assert_eq!(player.position, Some(Position::new(4, 2)));
    }

    #[test]
    fn test_player_plant_spawns_bomb_once() {
        let config = GameConfig::default();
        let mut ids = IdSequence::default();
        let mut player = BoardObject::Player(Player::new(ObjectId(1), "A", Position::new(3, 3)));
        if let Some(p) = player.as_player_mut() {
            assert!(!p.is_planting());
            p.plant_bomb();
        }
        assert!(player.as_player().is_some_and(Player::is_planting));

        let mut ctx = SpawnContext { ids: &mut ids, config: &config };
        let spawned = player.update(&mut ctx);
        assert!(!player.as_player().is_some_and(Player::is_planting));
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].kind(), ObjectKind::Bomb);
        assert_eq!(spawned[0].position(), Some(Position::new(3, 3)));

        let mut ctx = SpawnContext { ids: &mut ids, config: &config };
        assert!(player.update(&mut ctx).is_empty());
    }

    #[test]
    fn test_id_sequence_is_monotonic() {
        let mut ids = IdSequence::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(b > a);
        assert_eq!(a.to_string(), "obj-1");
    }
}
