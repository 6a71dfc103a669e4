//! Transport collaborator for Bombfield.
//!
//! The game core never touches sockets. It only needs something that can
//! accept connections and move whole frames in both directions, which is
//! what the [`Transport`] and [`Connection`] traits describe.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Allocates connection ids for one transport instance.
///
/// Each transport owns its own sequence, so two servers in the same process
/// (as in the integration tests) hand out independent ids.
#[derive(Debug, Clone)]
pub struct ConnectionIds {
    next: u64,
}

impl ConnectionIds {
    /// Starts a sequence whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Returns the next unused id.
    pub fn next_id(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next);
        self.next += 1;
        id
    }
}

impl Default for ConnectionIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops accepting new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that moves whole frames.
///
/// Sending and receiving are independent: one task may sit in
/// [`recv`](Connection::recv) while another calls
/// [`send`](Connection::send) for the same connection.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
