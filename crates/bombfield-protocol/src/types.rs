//! Records that travel on the wire between clients and the server.
//!
//! Every record is a flat JSON object whose `action` field names the
//! variant, e.g. `{"action": "join_room", "room": "5"}`. That is the
//! "internally tagged" serde representation, selected with
//! `#[serde(tag = "action")]`.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Server-side handle for one connected client.
///
/// The session manager only ever stores these ids. The socket behind an id
/// belongs to the connection handler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// A room name chosen by the client.
///
/// Rooms are addressed by whatever string the player typed ("5",
/// "lobby", ...), so this wraps a `String` rather than a number.
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Creates a room id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a client may send.
///
/// `key` in [`ClientMessage::Input`] stays a free-form string on purpose:
/// an unknown key is not a protocol error, the game simply ignores it when
/// the press is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Sets the display name used in game results and chat.
    Nickname { nickname: String },

    /// Asks to be seated in the given room, creating it if needed.
    JoinRoom { room: RoomId },

    /// A semantic key press: `up`, `down`, `left`, `right` or `x`.
    Input { key: String },

    /// A chat line relayed to every connected client.
    Message { message: String },
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Everything the server may send.
///
/// The action names are lowercase run-together words (`joinedroom`,
/// `gameresult`) except for `display_board`, so each variant is renamed
/// explicitly instead of relying on `rename_all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ServerMessage {
    /// The join request succeeded.
    #[serde(rename = "joinedroom")]
    JoinedRoom { room_number: RoomId },

    /// The room is full (or already playing).
    #[serde(rename = "declinedroom")]
    DeclinedRoom { room_number: RoomId },

    /// Both seats are taken; the match starts after a short grace delay.
    #[serde(rename = "gameprelude")]
    GamePrelude,

    /// The match is running; boards follow.
    #[serde(rename = "gamestart")]
    GameStart,

    /// One rendered board per tick.
    #[serde(rename = "display_board")]
    DisplayBoard { board: String },

    /// Final result. `winner` is empty for a draw, `loser` is empty when
    /// nobody was eliminated.
    #[serde(rename = "gameresult")]
    GameResult { winner: String, loser: String },

    /// A relayed chat line and the nickname of whoever sent it.
    #[serde(rename = "message")]
    Message { message: String, who: String },
}

impl ServerMessage {
    /// The `action` tag this message carries on the wire.
    pub fn action(&self) -> &'static str {
        match self {
            Self::JoinedRoom { .. } => "joinedroom",
            Self::DeclinedRoom { .. } => "declinedroom",
            Self::GamePrelude => "gameprelude",
            Self::GameStart => "gamestart",
            Self::DisplayBoard { .. } => "display_board",
            Self::GameResult { .. } => "gameresult",
            Self::Message { .. } => "message",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes below are what terminal clients parse, so they are
    //! checked field by field.

    use super::*;
    use serde_json::json;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_session_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&SessionId(42)).unwrap(), "42");
        assert_eq!(SessionId(42).to_string(), "S-42");
    }

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&RoomId::new("5")).unwrap(), "\"5\"");
        let id: RoomId = serde_json::from_str("\"lobby\"").unwrap();
        assert_eq!(id.as_str(), "lobby");
        assert_eq!(id.to_string(), "room-lobby");
    }

    // =====================================================================
    // ClientMessage
    // =====================================================================

    #[test]
    fn test_client_message_nickname_parses() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"action": "nickname", "nickname": "A"})).unwrap();
        assert_eq!(msg, ClientMessage::Nickname { nickname: "A".into() });
    }

    #[test]
    fn test_client_message_join_room_parses() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"action": "join_room", "room": "5"})).unwrap();
        assert_eq!(msg, ClientMessage::JoinRoom { room: RoomId::new("5") });
    }

    #[test]
    fn test_client_message_input_keeps_unknown_keys() {
        // Unknown keys are the game's problem, not the decoder's.
        let msg: ClientMessage =
            serde_json::from_value(json!({"action": "input", "key": "space"})).unwrap();
        assert_eq!(msg, ClientMessage::Input { key: "space".into() });
    }

    #[test]
    fn test_client_message_chat_parses() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"action": "message", "message": "gg"})).unwrap();
        assert_eq!(msg, ClientMessage::Message { message: "gg".into() });
    }

    #[test]
    fn test_client_message_unknown_action_is_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"action": "fly", "speed": 9000}));
        assert!(result.is_err());
    }

    #[test]
    fn test_client_message_missing_field_is_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"action": "join_room"}));
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerMessage
    // =====================================================================

    #[test]
    fn test_server_message_joined_room_json_format() {
        let value = serde_json::to_value(ServerMessage::JoinedRoom {
            room_number: RoomId::new("5"),
        })
        .unwrap();
        assert_eq!(value, json!({"action": "joinedroom", "room_number": "5"}));
    }

    #[test]
    fn test_server_message_declined_room_json_format() {
        let value = serde_json::to_value(ServerMessage::DeclinedRoom {
            room_number: RoomId::new("5"),
        })
        .unwrap();
        assert_eq!(value, json!({"action": "declinedroom", "room_number": "5"}));
    }

    #[test]
    fn test_server_message_unit_variants_carry_only_action() {
        assert_eq!(
            serde_json::to_value(ServerMessage::GamePrelude).unwrap(),
            json!({"action": "gameprelude"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::GameStart).unwrap(),
            json!({"action": "gamestart"})
        );
    }

    #[test]
    fn test_server_message_display_board_json_format() {
        let value = serde_json::to_value(ServerMessage::DisplayBoard {
            board: "++\n++\n".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"action": "display_board", "board": "++\n++\n"}));
    }

    #[test]
    fn test_server_message_game_result_json_format() {
        let value = serde_json::to_value(ServerMessage::GameResult {
            winner: "A".into(),
            loser: "B".into(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"action": "gameresult", "winner": "A", "loser": "B"})
        );
    }

    #[test]
    fn test_server_message_chat_json_format() {
        let value = serde_json::to_value(ServerMessage::Message {
            message: "hi".into(),
            who: "A".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"action": "message", "message": "hi", "who": "A"}));
    }

    #[test]
    fn test_server_message_action_matches_serialized_tag() {
        let all = [
            ServerMessage::JoinedRoom { room_number: RoomId::new("1") },
            ServerMessage::DeclinedRoom { room_number: RoomId::new("1") },
            ServerMessage::GamePrelude,
            ServerMessage::GameStart,
            ServerMessage::DisplayBoard { board: String::new() },
            ServerMessage::GameResult { winner: String::new(), loser: String::new() },
            ServerMessage::Message { message: String::new(), who: String::new() },
        ];
        for msg in all {
            let value = serde_json::to_value(&msg).unwrap();
            assert_eq!(value["action"], msg.action());
        }
    }
}
