//! The session manager: a single dispatch task that owns every session and
//! every room.
//!
//! Connection handlers report what their client did as [`SessionEvent`]s.
//! Room actors report what players should see as [`RoomEvent`]s. The
//! manager consumes both streams with `tokio::select!` and is the only
//! place that touches the [`SessionRegistry`] or the [`RoomRegistry`], so
//! neither needs a lock.

use std::collections::HashMap;

use bombfield_protocol::{ClientMessage, RoomId, ServerMessage, SessionId};
use bombfield_room::{RoomConfig, RoomEvent, RoomRegistry};
use bombfield_session::{SessionConfig, SessionRegistry};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Events and channels
// ---------------------------------------------------------------------------

/// What a connection handler tells the session manager.
#[derive(Debug)]
pub enum SessionEvent {
    /// A client connected. `outbound` feeds its writer task.
    Connected {
        id: SessionId,
        outbound: mpsc::Sender<ServerMessage>,
    },

    /// A client sent a well-formed message.
    Message { id: SessionId, message: ClientMessage },

    /// The client's connection closed.
    Disconnected { id: SessionId },
}

/// Sending half of the session manager's inbound channel.
pub type SessionEventSender = mpsc::UnboundedSender<SessionEvent>;

/// Outbound channels of every connected client, keyed by session.
///
/// Each channel is bounded. A client that stops reading loses messages
/// once its queue is full instead of growing it.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    outbound: HashMap<SessionId, mpsc::Sender<ServerMessage>>,
}

impl ConnectionTable {
    pub fn insert(&mut self, id: SessionId, outbound: mpsc::Sender<ServerMessage>) {
        self.outbound.insert(id, outbound);
    }

    /// Dropping the sender ends the client's writer task.
    pub fn remove(&mut self, id: SessionId) -> bool {
        self.outbound.remove(&id).is_some()
    }

    /// Queues `message` for one client without waiting. Returns `false` if
    /// the client is gone or its queue is full; delivery is best-effort.
    pub fn send(&self, id: SessionId, message: ServerMessage) -> bool {
        let Some(tx) = self.outbound.get(&id) else {
            return false;
        };
        match tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                tracing::debug!(session = %id, action = message.action(), "outbound queue full, dropping");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.outbound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Routes client messages to rooms and room output back to clients.
pub struct SessionManager {
    sessions: SessionRegistry,
    rooms: RoomRegistry,
    connections: ConnectionTable,
    inbound: mpsc::UnboundedReceiver<SessionEvent>,
    room_events: mpsc::UnboundedReceiver<RoomEvent>,
}

impl SessionManager {
    /// Creates a manager and the sender connection handlers report to.
    pub fn new(room_config: RoomConfig, session_config: SessionConfig) -> (Self, SessionEventSender) {
        let (tx, inbound) = mpsc::unbounded_channel();
        let (room_tx, room_events) = mpsc::unbounded_channel();
        let manager = Self {
            sessions: SessionRegistry::new(session_config),
            rooms: RoomRegistry::new(room_config, room_tx),
            connections: ConnectionTable::default(),
            inbound,
            room_events,
        };
        (manager, tx)
    }

    /// Runs the dispatch loop until every [`SessionEventSender`] is dropped.
    ///
    /// Room events are drained first, so a room's `DeleteRoom` is always
    /// handled before any client request that arrives after its result.
    pub async fn run(mut self) {
        tracing::info!("session manager running");
        loop {
            tokio::select! {
                biased;
                Some(event) = self.room_events.recv() => self.handle_room_event(event),
                event = self.inbound.recv() => match event {
                    Some(event) => self.handle_session_event(event).await,
                    None => break,
                },
            }
        }
        tracing::info!("session manager stopped");
    }

    async fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected { id, outbound } => self.connect(id, outbound),
            SessionEvent::Message { id, message } => match message {
                ClientMessage::Nickname { nickname } => self.set_nickname(id, nickname),
                ClientMessage::JoinRoom { room } => self.add_player_to_room(id, room).await,
                ClientMessage::Input { key } => self.pass_input_to_room(id, &key).await,
                ClientMessage::Message { message } => self.relay_chat(id, message),
            },
            SessionEvent::Disconnected { id } => self.disconnect(id).await,
        }
    }

    fn handle_room_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::SendMessageToPlayers { recipients, message } => {
                self.send_message_to_players(&recipients, &message);
            }
            RoomEvent::DeleteRoom { room } => self.delete_room(&room),
        }
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    fn connect(&mut self, id: SessionId, outbound: mpsc::Sender<ServerMessage>) {
        if let Err(e) = self.sessions.register(id) {
            tracing::warn!(session = %id, error = %e, "duplicate connection ignored");
            return;
        }
        self.connections.insert(id, outbound);
    }

    /// Forgets the client and frees its seat. The other player and the
    /// room itself carry on, except that a room left empty before its
    /// match started is dropped.
    async fn disconnect(&mut self, id: SessionId) {
        self.connections.remove(id);
        let session = match self.sessions.unregister(id) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(error = %e, "disconnect for unknown session");
                return;
            }
        };
        let Some(room_id) = session.room else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id).cloned() else {
            return;
        };
        if let Err(e) = room.remove_player(id).await {
            tracing::debug!(session = %id, %room_id, error = %e, "could not free seat");
            return;
        }
        match room.info().await {
            Ok(info) if !info.started && info.players.is_empty() => {
                self.rooms.remove(&room_id);
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(%room_id, error = %e, "room gone after leave"),
        }
    }

    fn set_nickname(&mut self, id: SessionId, nickname: String) {
        if let Err(e) = self.sessions.set_nickname(id, nickname) {
            tracing::debug!(error = %e, "nickname for unknown session");
        }
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    /// Seats the client in `room_id`, creating the room on first use, and
    /// answers with `joinedroom` or `declinedroom`.
    ///
    /// A client already seated somewhere is declined.
    pub async fn add_player_to_room(&mut self, id: SessionId, room_id: RoomId) {
        let Some(session) = self.sessions.get(id) else {
            tracing::debug!(session = %id, "join from unknown session");
            return;
        };
        if let Some(current) = &session.room {
            tracing::info!(session = %id, %room_id, current = %current, "join declined: already in a room");
            self.connections.send(id, ServerMessage::DeclinedRoom { room_number: room_id });
            return;
        }
        let nickname = session.nickname.clone();

        let room = self.rooms.get_or_create(&room_id).clone();
        match room.add_player(id, &nickname).await {
            Ok(()) => {
                if let Err(e) = self.sessions.set_room(id, Some(room_id.clone())) {
                    tracing::debug!(error = %e, "joined session vanished");
                }
                self.connections.send(id, ServerMessage::JoinedRoom { room_number: room_id });
            }
            Err(e) => {
                tracing::info!(session = %id, %room_id, reason = %e, "join declined");
                self.connections.send(id, ServerMessage::DeclinedRoom { room_number: room_id });
            }
        }
    }

    /// Forwards a key press, but only while the client's room is mid-match.
    pub async fn pass_input_to_room(&mut self, id: SessionId, key: &str) {
        let Some(room_id) = self.sessions.room_of(id) else {
            tracing::trace!(session = %id, "input outside a room");
            return;
        };
        let Some(room) = self.rooms.get(room_id) else {
            tracing::trace!(session = %id, %room_id, "input for unknown room");
            return;
        };
        if !room.is_running() {
            return;
        }
        let room = room.clone();
        if let Err(e) = room.input(id, key).await {
            tracing::debug!(session = %id, error = %e, "input dropped");
        }
    }

    /// Individually addressed fan-out. Clients that have gone away are
    /// skipped.
    pub fn send_message_to_players(&self, recipients: &[SessionId], message: &ServerMessage) {
        for &id in recipients {
            if !self.connections.send(id, message.clone()) {
                tracing::trace!(session = %id, action = message.action(), "recipient gone");
            }
        }
    }

    /// Takes the room off every member, then forgets it.
    pub fn delete_room(&mut self, room_id: &RoomId) {
        let cleared = self.sessions.clear_room(room_id);
        if self.rooms.remove(room_id).is_none() {
            tracing::trace!(%room_id, "delete for unknown room");
            return;
        }
        tracing::debug!(%room_id, players = cleared.len(), "room deleted");
    }

    /// Re-broadcasts a chat line to every connected client, tagged with the
    /// sender's nickname.
    fn relay_chat(&self, id: SessionId, message: String) {
        let Some(who) = self.sessions.nickname(id) else {
            return;
        };
        let line = ServerMessage::Message {
            message,
            who: who.to_owned(),
        };
        self.send_message_to_players(&self.sessions.ids(), &line);
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bombfield_game::{GameConfig, Position};
    use bombfield_tick::TickConfig;

    use super::*;

    // =====================================================================
    // Helpers
    // =====================================================================

    const FUSE: u32 = 6;

    /// 9x5 board, A at (1, 1) and B at (7, 1) on A's right-hand ray.
    fn room_config() -> RoomConfig {
        RoomConfig {
            grace_delay: Duration::from_millis(100),
            tick: TickConfig {
                initial_jitter_us: 0,
                ..TickConfig::default()
            },
            game: GameConfig {
                bomb_fuse_ticks: FUSE,
                flame_lifetime_ticks: 2,
                spawns: vec![Position::new(1, 1), Position::new(7, 1)],
                ..GameConfig::with_size(9, 5)
            },
            ..RoomConfig::default()
        }
    }

    struct Client {
        id: SessionId,
        rx: mpsc::Receiver<ServerMessage>,
    }

    impl Client {
        async fn next(&mut self) -> ServerMessage {
            self.rx.recv().await.expect("outbound channel closed")
        }

        /// Skips boards until something else arrives.
        async fn next_non_board(&mut self) -> ServerMessage {
            loop {
                match self.next().await {
                    ServerMessage::DisplayBoard { .. } => {}
                    other => return other,
                }
            }
        }
    }

    fn start_manager() -> SessionEventSender {
        let (manager, tx) = SessionManager::new(room_config(), SessionConfig::default());
        tokio::spawn(manager.run());
        tx
    }

    fn connect(tx: &SessionEventSender, id: u64, nickname: &str) -> Client {
        let id = SessionId(id);
        let (outbound, rx) = mpsc::channel(64);
        tx.send(SessionEvent::Connected { id, outbound }).unwrap();
        send(tx, id, ClientMessage::Nickname {
            nickname: nickname.into(),
        });
        Client { id, rx }
    }

    fn send(tx: &SessionEventSender, id: SessionId, message: ClientMessage) {
        tx.send(SessionEvent::Message { id, message }).unwrap();
    }

    fn join(tx: &SessionEventSender, client: &Client, room: &str) {
        send(tx, client.id, ClientMessage::JoinRoom {
            room: RoomId::new(room),
        });
    }

    fn joined(room: &str) -> ServerMessage {
        ServerMessage::JoinedRoom {
            room_number: RoomId::new(room),
        }
    }

    // =====================================================================
    // ConnectionTable
    // =====================================================================

    #[test]
    fn test_connection_table_send_to_missing_returns_false() {
        let table = ConnectionTable::default();
        assert!(!table.send(SessionId(1), ServerMessage::GameStart));
        assert!(table.is_empty());
    }

    #[test]
    fn test_connection_table_remove_closes_channel() {
        let mut table = ConnectionTable::default();
        let (tx, mut rx) = mpsc::channel(4);
        table.insert(SessionId(1), tx);
        assert!(table.send(SessionId(1), ServerMessage::GameStart));
        assert!(table.remove(SessionId(1)));
        assert_eq!(rx.try_recv(), Ok(ServerMessage::GameStart));
        assert!(rx.try_recv().is_err());
        assert!(!table.remove(SessionId(1)));
    }

    #[test]
    fn test_connection_table_full_queue_drops_message() {
        let mut table = ConnectionTable::default();
        let (tx, mut rx) = mpsc::channel(1);
        table.insert(SessionId(1), tx);

        assert!(table.send(SessionId(1), ServerMessage::GamePrelude));
        assert!(!table.send(SessionId(1), ServerMessage::GameStart));

        assert_eq!(rx.try_recv(), Ok(ServerMessage::GamePrelude));
        assert!(rx.try_recv().is_err());
        // Room frees up once the client reads again.
        assert!(table.send(SessionId(1), ServerMessage::GameStart));
    }

    // =====================================================================
    // Joining
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_add_player_to_room_two_join_then_prelude() {
        let tx = start_manager();
        let mut a = connect(&tx, 1, "A");
        let mut b = connect(&tx, 2, "B");

        join(&tx, &a, "5");
        join(&tx, &b, "5");

        assert_eq!(a.next().await, joined("5"));
        assert_eq!(b.next().await, joined("5"));
        assert_eq!(a.next().await, ServerMessage::GamePrelude);
        assert_eq!(b.next().await, ServerMessage::GamePrelude);
        assert_eq!(a.next().await, ServerMessage::GameStart);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_player_to_room_third_is_declined() {
        let tx = start_manager();
        let a = connect(&tx, 1, "A");
        let b = connect(&tx, 2, "B");
        let mut c = connect(&tx, 3, "C");

        join(&tx, &a, "5");
        join(&tx, &b, "5");
        join(&tx, &c, "5");

        assert_eq!(
            c.next().await,
            ServerMessage::DeclinedRoom {
                room_number: RoomId::new("5"),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_player_to_room_while_seated_is_declined() {
        let tx = start_manager();
        let mut a = connect(&tx, 1, "A");

        join(&tx, &a, "5");
        join(&tx, &a, "6");

        assert_eq!(a.next().await, joined("5"));
        assert_eq!(
            a.next().await,
            ServerMessage::DeclinedRoom {
                room_number: RoomId::new("6"),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_frees_seat_before_start() {
        let tx = start_manager();
        let mut a = connect(&tx, 1, "A");
        join(&tx, &a, "5");
        assert_eq!(a.next().await, joined("5"));

        tx.send(SessionEvent::Disconnected { id: a.id }).unwrap();

        let mut b = connect(&tx, 2, "B");
        let mut c = connect(&tx, 3, "C");
        join(&tx, &b, "5");
        join(&tx, &c, "5");
        assert_eq!(b.next().await, joined("5"));
        assert_eq!(c.next().await, joined("5"));
        assert_eq!(b.next().await, ServerMessage::GamePrelude);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_drops_room_left_empty_before_start() {
        let (mut manager, _tx) = SessionManager::new(room_config(), SessionConfig::default());
        let (outbound, _rx) = mpsc::channel(8);
        manager.connect(SessionId(1), outbound);

        manager.add_player_to_room(SessionId(1), RoomId::new("lonely")).await;
        assert!(manager.rooms.contains(&RoomId::new("lonely")));

        manager.disconnect(SessionId(1)).await;
        assert!(!manager.rooms.contains(&RoomId::new("lonely")));
        assert!(manager.rooms.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_keeps_started_room() {
        let (mut manager, _tx) = SessionManager::new(room_config(), SessionConfig::default());
        let (out_a, _rx_a) = mpsc::channel(8);
        let (out_b, _rx_b) = mpsc::channel(8);
        manager.connect(SessionId(1), out_a);
        manager.connect(SessionId(2), out_b);
        manager.add_player_to_room(SessionId(1), RoomId::new("5")).await;
        manager.add_player_to_room(SessionId(2), RoomId::new("5")).await;

        manager.disconnect(SessionId(1)).await;
        assert!(manager.rooms.contains(&RoomId::new("5")));
    }

    // =====================================================================
    // Chat
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_chat_is_relayed_to_everyone_with_sender_nickname() {
        let tx = start_manager();
        let mut a = connect(&tx, 1, "A");
        let mut b = connect(&tx, 2, "B");

        send(&tx, a.id, ClientMessage::Message {
            message: "hi".into(),
        });

        let expected = ServerMessage::Message {
            message: "hi".into(),
            who: "A".into(),
        };
        assert_eq!(a.next().await, expected);
        assert_eq!(b.next().await, expected);
    }

    // =====================================================================
    // Input and match results
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_input_outside_room_is_dropped() {
        let tx = start_manager();
        let mut a = connect(&tx, 1, "A");

        send(&tx, a.id, ClientMessage::Input { key: "x".into() });
        send(&tx, a.id, ClientMessage::Message {
            message: "still here".into(),
        });

        assert!(matches!(a.next().await, ServerMessage::Message { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_match_result_then_room_is_deleted_and_reusable() {
        let tx = start_manager();
        let mut a = connect(&tx, 1, "A");
        let mut b = connect(&tx, 2, "B");
        join(&tx, &a, "5");
        join(&tx, &b, "5");

        assert_eq!(a.next().await, joined("5"));
        assert_eq!(a.next().await, ServerMessage::GamePrelude);
        assert_eq!(a.next().await, ServerMessage::GameStart);
        assert!(matches!(a.next().await, ServerMessage::DisplayBoard { .. }));

        // Plant, then step out of the blast to (2, 2).
        send(&tx, a.id, ClientMessage::Input { key: "x".into() });
        assert!(matches!(a.next().await, ServerMessage::DisplayBoard { .. }));
        send(&tx, a.id, ClientMessage::Input { key: "right".into() });
        send(&tx, a.id, ClientMessage::Input { key: "down".into() });

        let result = ServerMessage::GameResult {
            winner: "A".into(),
            loser: "B".into(),
        };
        assert_eq!(a.next_non_board().await, result);
        let b_result = loop {
            let msg = b.next().await;
            if matches!(msg, ServerMessage::GameResult { .. }) {
                break msg;
            }
        };
        assert_eq!(b_result, result);

        // Room "5" is gone: joining again creates a fresh one.
        join(&tx, &a, "5");
        assert_eq!(a.next().await, joined("5"));
    }
}
