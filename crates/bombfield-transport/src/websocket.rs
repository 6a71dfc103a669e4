//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, ConnectionIds, Transport, TransportError};

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    ids: ConnectionIds,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            ids: ConnectionIds::default(),
        })
    }

    /// Returns the address the listener is actually bound to.
    ///
    /// Useful after binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = self.ids.next_id();
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        // Split so a reader parked in `recv` never holds up per-tick sends.
        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer: addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// The remote peer's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// JSON records go out as text frames; anything that isn't UTF-8 is
    /// sent as a binary frame.
    async fn send(&self, frame: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(frame) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(frame.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
