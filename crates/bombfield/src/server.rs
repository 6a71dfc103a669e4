//! `BombfieldServer` builder and server loop.
//!
//! This is the entry point for running a Bombfield game server. It ties
//! the layers together: transport → protocol → session manager → rooms.

use bombfield_game::Game;
use bombfield_protocol::JsonCodec;
use bombfield_room::RoomConfig;
use bombfield_session::SessionConfig;
use bombfield_transport::{Transport, WebSocketTransport};
use serde::{Deserialize, Serialize};

use crate::BombfieldError;
use crate::handler::handle_connection;
use crate::manager::{SessionEventSender, SessionManager};

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Everything needed to start a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on. Port 0 picks a free port.
    ///
    /// Default: `"127.0.0.1:8080"`.
    pub bind_addr: String,

    /// Nickname a client has until it sends one.
    pub default_nickname: String,

    /// Rules for every room.
    pub room: RoomConfig,

    /// Records queued per client before further ones are dropped.
    ///
    /// Default: `256`.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_owned(),
            default_nickname: SessionConfig::default().default_nickname,
            room: RoomConfig::default(),
            outbound_buffer: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Bombfield server.
///
/// # Example
///
/// ```rust,no_run
/// use bombfield::prelude::*;
///
/// # async fn start() -> Result<(), BombfieldError> {
/// let server = BombfieldServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BombfieldServerBuilder {
    config: ServerConfig,
}

impl BombfieldServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a complete configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_owned();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Sets how many records may queue per client before drops start.
    pub fn outbound_buffer(mut self, buffer: usize) -> Self {
        self.config.outbound_buffer = buffer;
        self
    }

    /// Sets the nickname clients have before they pick one.
    pub fn default_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.config.default_nickname = nickname.into();
        self
    }

    /// Validates the match rules, binds the listener and sets up the
    /// session manager.
    ///
    /// # Errors
    /// Returns a game error if the board or spawns are unusable, a room
    /// error if the seat count is wrong, and a transport error if the
    /// address can't be bound.
    pub async fn build(self) -> Result<BombfieldServer, BombfieldError> {
        // Rejects boards that could never host a match before any client
        // gets as far as joining.
        Game::new(self.config.room.game.clone())?;
        self.config.room.validate()?;

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let session_config = SessionConfig {
            default_nickname: self.config.default_nickname,
        };
        let (manager, events) = SessionManager::new(self.config.room, session_config);

        Ok(BombfieldServer {
            transport,
            codec: JsonCodec,
            manager,
            events,
            outbound_buffer: self.config.outbound_buffer,
        })
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound Bombfield server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BombfieldServer {
    transport: WebSocketTransport,
    codec: JsonCodec,
    manager: SessionManager,
    events: SessionEventSender,
    outbound_buffer: usize,
}

impl BombfieldServer {
    /// Creates a new builder.
    pub fn builder() -> BombfieldServerBuilder {
        BombfieldServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the session manager and the accept loop.
    ///
    /// Spawns a handler task for each accepted connection. A failed accept
    /// or handshake is logged and only affects that connection. Runs until
    /// the process is terminated.
    pub async fn run(self) -> Result<(), BombfieldError> {
        let Self {
            mut transport,
            codec,
            manager,
            events,
            outbound_buffer,
        } = self;

        tokio::spawn(manager.run());
        tracing::info!(addr = ?transport.local_addr().ok(), "Bombfield server running");

        loop {
            match transport.accept().await {
                Ok(conn) => {
                    let events = events.clone();
                    tokio::spawn(async move {
                        let result = handle_connection(conn, codec, events, outbound_buffer).await;
                        if let Err(e) = result {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
