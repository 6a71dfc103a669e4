//! Room actor: an isolated Tokio task that seats two players and runs
//! their match.
//!
//! Each room runs in its own task, communicating with the outside world
//! through channels:
//!
//! ```text
//!                 RoomCommand (mpsc, bounded)
//! RoomHandle ───────────────────────────────────→ RoomActor ── owns ──→ Game
//!     ▲                                              │
//!     └──────── RoomState (watch) ───────────────────┤
//!                                                    │
//! session manager ←──── RoomEvent (mpsc, unbounded) ─┘
//! ```
//!
//! The actor keeps serving commands while it waits between ticks, so a
//! join, leave or key press never waits for the match to progress.

use bombfield_game::Game;
use bombfield_protocol::{RoomId, ServerMessage, SessionId};
use bombfield_tick::TickPacer;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};

use crate::{RoomConfig, RoomError, RoomState};

/// Something a room asks the session manager to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Deliver `message` to each listed session.
    SendMessageToPlayers {
        recipients: Vec<SessionId>,
        message: ServerMessage,
    },

    /// The match is over; forget this room.
    DeleteRoom { room: RoomId },
}

/// Channel on which rooms report [`RoomEvent`]s.
pub type RoomEventSender = mpsc::UnboundedSender<RoomEvent>;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the response on it.
pub(crate) enum RoomCommand {
    AddPlayer {
        session: SessionId,
        nickname: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    RemovePlayer {
        session: SessionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Input {
        session: SessionId,
        key: String,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
}

/// A snapshot of room metadata (not the game itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub state: RoomState,
    /// Player names in seat order.
    pub players: Vec<String>,
    pub capacity: usize,
    /// `true` once the room filled up; it never goes back.
    pub started: bool,
}

/// One occupied seat.
#[derive(Debug, Clone)]
struct Seat {
    session: SessionId,
    /// Name the game knows this player by. Unique within the room.
    name: String,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone: an `mpsc::Sender` plus a `watch::Receiver`. The
/// `RoomRegistry` holds one of these per room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
    state: watch::Receiver<RoomState>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// The room's current state, without a round trip to the actor.
    pub fn state(&self) -> RoomState {
        *self.state.borrow()
    }

    /// `true` while the match is running and accepting input.
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Asks for a seat. On the last free seat the room starts its match.
    pub async fn add_player(&self, session: SessionId, nickname: &str) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::AddPlayer {
            session,
            nickname: nickname.to_owned(),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Gives up a seat. Mid-match this resets the room to `NotStarted`.
    pub async fn remove_player(&self, session: SessionId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::RemovePlayer {
            session,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Forwards a key press (fire-and-forget). The room drops it unless it
    /// is running and `session` is seated.
    pub async fn input(&self, session: SessionId, key: &str) -> Result<(), RoomError> {
        self.send(RoomCommand::Input {
            session,
            key: key.to_owned(),
        })
        .await
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    config: RoomConfig,
    seats: Vec<Seat>,
    /// Set when the last seat is taken. Joins are refused from then on.
    started: bool,
    game: Option<Game>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// `false` once every handle is gone.
    commands_open: bool,
    state: watch::Sender<RoomState>,
    events: RoomEventSender,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while !self.started {
            match self.receiver.recv().await {
                Some(cmd) => self.handle(cmd),
                None => {
                    tracing::info!(room_id = %self.room_id, "room abandoned before start");
                    return;
                }
            }
        }

        self.run_match().await;
        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    /// Prelude, grace delay, ticks, result.
    async fn run_match(&mut self) {
        tracing::info!(
            room_id = %self.room_id,
            players = self.seats.len(),
            "match starting"
        );
        self.broadcast(ServerMessage::GamePrelude);
        self.serve_until(Instant::now() + self.config.grace_delay).await;

        let names: Vec<String> = self.seats.iter().map(|s| s.name.clone()).collect();
        let game = Game::new(self.config.game.clone()).and_then(|mut game| {
            game.start(names.as_slice())?;
            Ok(game)
        });
        match game {
            Ok(game) => self.game = Some(game),
            Err(e) => {
                tracing::error!(room_id = %self.room_id, error = %e, "match could not start");
                self.finish(String::new(), String::new());
                return;
            }
        }
        self.state.send_replace(RoomState::Running);
        self.broadcast(ServerMessage::GameStart);
        tracing::info!(room_id = %self.room_id, players = ?names, "match started");

        let mut pacer = TickPacer::new(self.config.tick.clone());
        self.serve_until(Instant::now() + pacer.start_delay()).await;

        loop {
            let Some(game) = self.game.as_mut() else {
                break;
            };
            if !game.is_running() {
                break;
            }
            pacer.begin_tick();
            game.process_loop_once();
            let board = game.snapshot().to_owned();
            self.broadcast(ServerMessage::DisplayBoard { board });

            let deadline = pacer
                .end_tick()
                .map_or_else(Instant::now, |info| info.deadline);
            self.serve_until(deadline).await;
        }

        let (winner, loser) = match &self.game {
            Some(game) => (
                game.winner().unwrap_or_default().to_owned(),
                game.eliminated().join(", "),
            ),
            None => (String::new(), String::new()),
        };
        tracing::info!(
            room_id = %self.room_id,
            %winner,
            %loser,
            ticks = pacer.tick_count(),
            "match finished"
        );
        self.finish(winner, loser);
    }

    fn finish(&mut self, winner: String, loser: String) {
        self.broadcast(ServerMessage::GameResult { winner, loser });
        self.state.send_replace(RoomState::Ended);
        let _ = self.events.send(RoomEvent::DeleteRoom {
            room: self.room_id.clone(),
        });
    }

    /// Handles commands until `deadline`.
    async fn serve_until(&mut self, deadline: Instant) {
        let sleep = time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return,
                cmd = self.receiver.recv(), if self.commands_open => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => self.commands_open = false,
                },
            }
        }
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::AddPlayer {
                session,
                nickname,
                reply,
            } => {
                let result = self.handle_add(session, nickname);
                let _ = reply.send(result);
                // Start only after the joiner has its answer.
                if !self.seats.is_empty() && self.seats.len() >= self.config.seats() {
                    self.started = true;
                }
            }
            RoomCommand::RemovePlayer { session, reply } => {
                let result = self.handle_remove(session);
                let _ = reply.send(result);
            }
            RoomCommand::Input { session, key } => self.handle_input(session, &key),
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
        }
    }

    fn handle_add(&mut self, session: SessionId, nickname: String) -> Result<(), RoomError> {
        if self.started {
            return Err(RoomError::AlreadyStarted(self.room_id.clone()));
        }
        if self.seats.iter().any(|s| s.session == session) {
            return Err(RoomError::AlreadySeated(session, self.room_id.clone()));
        }
        if self.seats.len() >= self.config.seats() {
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }

        let name = self.unique_name(nickname);
        self.seats.push(Seat { session, name });
        tracing::info!(
            room_id = %self.room_id,
            %session,
            players = self.seats.len(),
            "player joined"
        );
        Ok(())
    }

    fn handle_remove(&mut self, session: SessionId) -> Result<(), RoomError> {
        let Some(idx) = self.seats.iter().position(|s| s.session == session) else {
            return Err(RoomError::NotSeated(session, self.room_id.clone()));
        };
        self.seats.remove(idx);
        self.state.send_if_modified(|state| {
            let changed = *state != RoomState::NotStarted && *state != RoomState::Ended;
            if changed {
                *state = RoomState::NotStarted;
            }
            changed
        });

        tracing::info!(
            room_id = %self.room_id,
            %session,
            players = self.seats.len(),
            "player left"
        );
        Ok(())
    }

    fn handle_input(&mut self, session: SessionId, key: &str) {
        if !self.state.borrow().is_running() {
            tracing::trace!(room_id = %self.room_id, %session, "input while not running, ignoring");
            return;
        }
        let Some(seat) = self.seats.iter().find(|s| s.session == session) else {
            tracing::trace!(room_id = %self.room_id, %session, "input from non-member, ignoring");
            return;
        };
        if let Some(game) = self.game.as_mut() {
            game.on_player_key_press(&seat.name, key);
        }
    }

    /// `nickname`, or `nickname#N` if someone seated here already uses it.
    fn unique_name(&self, nickname: String) -> String {
        let taken = |name: &str| self.seats.iter().any(|s| s.name == name);
        if !taken(&nickname) {
            return nickname;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{nickname}#{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Sends `message` to everyone currently seated.
    fn broadcast(&self, message: ServerMessage) {
        let recipients: Vec<SessionId> = self.seats.iter().map(|s| s.session).collect();
        if recipients.is_empty() {
            return;
        }
        let _ = self.events.send(RoomEvent::SendMessageToPlayers {
            recipients,
            message,
        });
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            state: *self.state.borrow(),
            players: self.seats.iter().map(|s| s.name.clone()).collect(),
            capacity: self.config.seats(),
            started: self.started,
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// The command channel is bounded by `config.channel_size`; senders wait
/// when it fills up.
pub(crate) fn spawn_room(room_id: RoomId, config: RoomConfig, events: RoomEventSender) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let (state_tx, state_rx) = watch::channel(RoomState::NotStarted);

    let actor = RoomActor {
        room_id: room_id.clone(),
        config,
        seats: Vec::new(),
        started: false,
        game: None,
        receiver: rx,
        commands_open: true,
        state: state_tx,
        events,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
        state: state_rx,
    }
}
