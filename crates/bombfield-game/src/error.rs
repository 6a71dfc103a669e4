use crate::Position;

/// Errors from setting up a match. Ticking never fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("board {width}x{height} is too small (minimum 3x3)")]
    BoardTooSmall { width: u32, height: u32 },

    #[error("game already started")]
    AlreadyStarted,

    #[error("{players} players but only {spawns} spawn points")]
    NotEnoughSpawns { players: usize, spawns: usize },

    #[error("spawn point {0} is outside the board")]
    SpawnOutOfBounds(Position),

    #[error("spawn point {0} is on a block")]
    SpawnOnBlock(Position),

    #[error("spawn point {0} is used by more than one slot")]
    DuplicateSpawn(Position),

    #[error("nickname {0:?} is used twice")]
    DuplicateNickname(String),
}
