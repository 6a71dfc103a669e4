//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding records.
///
/// A `ProtocolError` never ends a session by itself: the connection handler
/// logs it and keeps reading.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown `action`, or a
    /// missing field.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but makes no sense here.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
