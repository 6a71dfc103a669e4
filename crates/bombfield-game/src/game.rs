//! The match simulation.
//!
//! [`Game`] owns every live object and the derived [`Board`]. The caller
//! drives it one tick at a time with [`Game::process_loop_once`]; pacing
//! between ticks is the caller's job.
//!
//! # Tick order
//!
//! 1. apply queued key presses (in arrival order)
//! 2. re-derive the board
//! 3. update every object, then append what the updates spawned
//! 4. drop objects whose position was cleared
//! 5. re-derive the board
//! 6. eliminate players standing in flames; end the game if at most one
//!    player is left
//! 7. render the snapshot
//!
//! Objects spawned in step 3 are not updated until the next tick, so a
//! bomb planted on tick `T` detonates on tick `T + fuse`, and a flame born
//! on tick `T` is gone on tick `T + lifetime`.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, trace};

use crate::layout::standard_blocks;
use crate::{
    Block, Board, BoardObject, GameConfig, GameError, IdSequence, KeyAction, ObjectId, ObjectKind,
    Player, Position, SpawnContext,
};

/// Where a game is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    NotStarted,
    Running,
    Ended,
}

#[derive(Debug, Clone)]
struct KeyPress {
    nickname: String,
    key: String,
}

#[derive(Debug)]
pub struct Game {
    config: GameConfig,
    board: Board,
    objects: Vec<BoardObject>,
    /// Surviving players in slot order.
    players: Vec<(String, ObjectId)>,
    key_presses: VecDeque<KeyPress>,
    phase: GamePhase,
    ids: IdSequence,
    tick: u64,
    eliminated: Vec<String>,
    winner: Option<String>,
    snapshot: String,
}

impl Game {
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        if config.width < 3 || config.height < 3 {
            return Err(GameError::BoardTooSmall {
                width: config.width,
                height: config.height,
            });
        }
        validate_spawns(&config)?;
        Ok(Self {
            board: Board::new(config.width, config.height),
            config,
            objects: Vec::new(),
            players: Vec::new(),
            key_presses: VecDeque::new(),
            phase: GamePhase::NotStarted,
            ids: IdSequence::default(),
            tick: 0,
            eliminated: Vec::new(),
            winner: None,
            snapshot: String::new(),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Lays out the blocks, spawns one player per nickname (slot `i` at
    /// spawn point `i`) and starts the game.
    pub fn start<S: AsRef<str>>(&mut self, nicknames: &[S]) -> Result<(), GameError> {
        if self.phase != GamePhase::NotStarted {
            return Err(GameError::AlreadyStarted);
        }
        let spawns = self.config.spawn_points();
        if nicknames.len() > spawns.len() {
            return Err(GameError::NotEnoughSpawns {
                players: nicknames.len(),
                spawns: spawns.len(),
            });
        }
        let mut seen = HashSet::new();
        for nickname in nicknames {
            if !seen.insert(nickname.as_ref()) {
                return Err(GameError::DuplicateNickname(nickname.as_ref().to_owned()));
            }
        }

        let mut objects: Vec<BoardObject> = standard_blocks(self.config.width, self.config.height)
            .into_iter()
            .map(|at| BoardObject::Block(Block::new(self.ids.next_id(), at)))
            .collect();
        for (nickname, spawn) in nicknames.iter().zip(spawns) {
            let player = Player::new(self.ids.next_id(), nickname.as_ref(), spawn);
            self.players.push((nickname.as_ref().to_owned(), player.id));
            objects.push(BoardObject::Player(player));
        }

        self.objects = objects;
        self.key_presses.clear();
        self.rebuild_board();
        self.snapshot = self.board.render();
        self.phase = GamePhase::Running;

        debug!(
            players = self.players.len(),
            objects = self.objects.len(),
            "game started"
        );
        Ok(())
    }

    /// Queues a key press for the next tick. Unknown keys and nicknames
    /// are dropped when the queue is applied.
    pub fn on_player_key_press(&mut self, nickname: &str, key: &str) {
        self.key_presses.push_back(KeyPress {
            nickname: nickname.to_owned(),
            key: key.to_owned(),
        });
    }

    /// Runs one tick. Does nothing unless the game is running.
    pub fn process_loop_once(&mut self) {
        if self.phase != GamePhase::Running {
            return;
        }
        self.tick += 1;

        self.apply_key_presses();
        self.rebuild_board();
        self.update_objects();
        self.objects.retain(|object| object.position().is_some());
        self.rebuild_board();
        self.remove_dead_players();
        self.snapshot = self.board.render();

        trace!(tick = self.tick, objects = self.objects.len(), "tick processed");
    }

    // -----------------------------------------------------------------------
    // Tick steps
    // -----------------------------------------------------------------------

    fn apply_key_presses(&mut self) {
        let Self {
            key_presses,
            players,
            objects,
            board,
            ..
        } = self;

        for press in key_presses.drain(..) {
            let Some(action) = KeyAction::from_key(&press.key) else {
                trace!(key = %press.key, "unknown key ignored");
                continue;
            };
            let Some(id) = players
                .iter()
                .find(|(nickname, _)| *nickname == press.nickname)
                .map(|(_, id)| *id)
            else {
                trace!(nickname = %press.nickname, "key press for unknown player ignored");
                continue;
            };
            if let Some(player) = objects
                .iter_mut()
                .find(|object| object.id() == id)
                .and_then(BoardObject::as_player_mut)
            {
                player.apply(action, board);
            }
        }
    }

    fn rebuild_board(&mut self) {
        self.board.clear();
        for object in &self.objects {
            self.board.add_object(object);
        }
    }

    fn update_objects(&mut self) {
        let mut ctx = SpawnContext {
            ids: &mut self.ids,
            config: &self.config,
        };
        let mut spawned = Vec::new();
        for object in &mut self.objects {
            spawned.extend(object.update(&mut ctx));
        }
        self.objects.extend(spawned);
    }

    fn remove_dead_players(&mut self) {
        let mut survivors = Vec::with_capacity(self.players.len());
        for (nickname, id) in std::mem::take(&mut self.players) {
            let Some(object) = self.objects.iter_mut().find(|object| object.id() == id) else {
                continue;
            };
            let burning = object
                .position()
                .is_some_and(|at| self.board.get_tile_objects(at).contains(&ObjectKind::Flame));
            if burning {
                object.remove();
                debug!(%nickname, tick = self.tick, "player eliminated");
                self.eliminated.push(nickname);
            } else {
                survivors.push((nickname, id));
            }
        }
        self.players = survivors;

        if self.players.len() <= 1 {
            self.phase = GamePhase::Ended;
            self.winner = self.players.first().map(|(nickname, _)| nickname.clone());
            debug!(
                tick = self.tick,
                winner = self.winner.as_deref().unwrap_or(""),
                "game over"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Ticks processed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The board as rendered at the end of the last tick (or at start).
    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    /// The sole survivor, once the game has ended. `None` for a draw.
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// Eliminated nicknames, in elimination order.
    pub fn eliminated(&self) -> &[String] {
        &self.eliminated
    }

    /// Surviving players and where they stand, in slot order.
    pub fn players(&self) -> Vec<(&str, Position)> {
        self.players
            .iter()
            .filter_map(|(nickname, id)| {
                let at = self.objects.iter().find(|o| o.id() == *id)?.position()?;
                Some((nickname.as_str(), at))
            })
            .collect()
    }

    pub fn player_position(&self, nickname: &str) -> Option<Position> {
        self.players()
            .into_iter()
            .find(|(name, _)| *name == nickname)
            .map(|(_, at)| at)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn objects(&self) -> &[BoardObject] {
        &self.objects
    }

    /// Key presses waiting for the next tick.
    pub fn pending_key_presses(&self) -> usize {
        self.key_presses.len()
    }
}

/// Every spawn point must be an open interior cell, and no two slots may
/// share one.
fn validate_spawns(config: &GameConfig) -> Result<(), GameError> {
    let blocks: HashSet<Position> = standard_blocks(config.width, config.height).into_iter().collect();
    let (w, h) = (config.width as i32, config.height as i32);
    let mut seen = HashSet::new();
    for spawn in config.spawn_points() {
        if spawn.x < 0 || spawn.y < 0 || spawn.x >= w || spawn.y >= h {
            return Err(GameError::SpawnOutOfBounds(spawn));
        }
        if blocks.contains(&spawn) {
            return Err(GameError::SpawnOnBlock(spawn));
        }
        if !seen.insert(spawn) {
            return Err(GameError::DuplicateSpawn(spawn));
        }
    }
    Ok(())
}
