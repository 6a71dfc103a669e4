//! Per-connection handler: frames in, records out.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`], which:
//!   1. Registers the client with the session manager
//!   2. Spawns a writer task draining the client's outbound channel
//!   3. Reads frames until the socket closes, forwarding decoded messages
//!   4. Reports the disconnect

use std::sync::Arc;

use bombfield_protocol::{ClientMessage, Codec, SessionId};
use bombfield_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::BombfieldError;
use crate::manager::{SessionEvent, SessionEventSender};

/// Handles a single connection from accept to close.
///
/// `buffer` bounds the client's outbound queue; the manager drops records
/// for a client whose queue is full.
pub(crate) async fn handle_connection<C: Codec + Clone>(
    conn: WebSocketConnection,
    codec: C,
    events: SessionEventSender,
    buffer: usize,
) -> Result<(), BombfieldError> {
    let conn = Arc::new(conn);
    let id = SessionId(conn.id().into_inner());
    tracing::debug!(session = %id, peer = %conn.peer_addr(), "handling new connection");

    let (outbound, mut outbox) = mpsc::channel(buffer.max(1));
    events
        .send(SessionEvent::Connected { id, outbound })
        .map_err(|_| BombfieldError::ManagerStopped)?;

    let writer = {
        let conn = Arc::clone(&conn);
        let codec = codec.clone();
        tokio::spawn(async move {
            while let Some(message) = outbox.recv().await {
                let frame = match codec.encode(&message) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(session = %id, error = %e, "failed to encode message");
                        continue;
                    }
                };
                if let Err(e) = conn.send(&frame).await {
                    tracing::debug!(session = %id, error = %e, "send failed, stopping writer");
                    break;
                }
            }
        })
    };

    let result = read_frames(&conn, &codec, id, &events).await;

    // The manager drops our outbound sender on disconnect, which ends the
    // writer once everything queued has been flushed.
    let _ = events.send(SessionEvent::Disconnected { id });
    let _ = writer.await;
    let _ = conn.close().await;
    tracing::info!(session = %id, "connection closed");
    result
}

/// Forwards decoded client messages until the peer goes away.
///
/// Frames that don't decode are logged and skipped; they never end the
/// connection.
async fn read_frames<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    id: SessionId,
    events: &SessionEventSender,
) -> Result<(), BombfieldError> {
    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::debug!(session = %id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let message: ClientMessage = match codec.decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(session = %id, error = %e, "ignoring undecodable frame");
                continue;
            }
        };

        tracing::trace!(session = %id, ?message, "client message");
        events
            .send(SessionEvent::Message { id, message })
            .map_err(|_| BombfieldError::ManagerStopped)?;
    }
}
