//! Codec trait and implementations for turning records into frames.
//!
//! The session layer only needs something that implements [`Codec`];
//! [`JsonCodec`] is what the terminal clients speak.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes records to bytes and decodes bytes back into records.
///
/// `Send + Sync + 'static` because one codec is shared by every connection
/// task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one frame.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one frame into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] for an empty frame and
    /// a decode error when the bytes don't match `T`.
    fn decode<T: DeserializeOwned>(&self, frame: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use bombfield_protocol::{ClientMessage, Codec, JsonCodec, RoomId};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec.decode(br#"{"action":"join_room","room":"5"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::JoinRoom { room: RoomId::new("5") });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, frame: &[u8]) -> Result<T, ProtocolError> {
        if frame.iter().all(u8::is_ascii_whitespace) {
            return Err(ProtocolError::InvalidMessage("empty frame".into()));
        }
        serde_json::from_slice(frame).map_err(ProtocolError::Decode)
    }
}
