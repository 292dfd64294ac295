//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Each WebSocket message is handed to the connection's framer as one
//! chunk, so with [`FramingConfig::unframed`] every WebSocket message is one
//! packet, and with a delimiter several packets may share one message.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{
    Connection, ConnectionId, Framer, FramingConfig, RawMessage, Transport, TransportError,
};

type WsStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    framing: FramingConfig,
    shut_down: AtomicBool,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str, framing: FramingConfig) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            framing,
            shut_down: AtomicBool::new(false),
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(TransportError::Shutdown);
        }
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| TransportError::AcceptFailed(ws_io(io::ErrorKind::ConnectionRefused, e)))?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        Ok(WebSocketConnection {
            id,
            framing: self.framing,
            ws: Mutex::new(ws),
            inbound: Mutex::new((Framer::new(self.framing), VecDeque::new())),
            closed: AtomicBool::new(false),
        })
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            tracing::info!(addr = ?self.listener.local_addr().ok(), "WebSocket transport shut down");
        }
        Ok(())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    framing: FramingConfig,
    ws: Mutex<WsStream>,
    inbound: Mutex<(Framer, VecDeque<RawMessage>)>,
    closed: AtomicBool,
}

impl WebSocketConnection {
    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed(format!("{} was closed", self.id)));
        }
        Ok(())
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        use futures_util::SinkExt;

        self.ensure_open()?;
        let msg = Message::Binary(self.framing.frame(data).into());
        self.ws
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(ws_io(io::ErrorKind::BrokenPipe, e)))
    }

    async fn recv(&self) -> Result<Option<RawMessage>, Self::Error> {
        use futures_util::StreamExt;

        self.ensure_open()?;
        let mut inbound = self.inbound.lock().await;
        let (framer, pending) = &mut *inbound;

        loop {
            if let Some(message) = pending.pop_front() {
                return Ok(Some(message));
            }

            let msg = self.ws.lock().await.next().await;
            let chunk: Vec<u8> = match msg {
                Some(Ok(Message::Binary(data))) => data.into(),
                Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(Message::Close(_))) | None => {
                    let buffered = framer.buffered();
                    if buffered > 0 {
                        framer.reset();
                        return Err(TransportError::EndOfStream { buffered });
                    }
                    return Ok(None);
                }
                // ping, pong and raw frames
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(ws_io(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            };

            pending.extend(framer.feed(&chunk)?);
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.ws
            .lock()
            .await
            .close(None)
            .await
            .map_err(|e| TransportError::SendFailed(ws_io(io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

fn ws_io(kind: io::ErrorKind, e: tokio_tungstenite::tungstenite::Error) -> io::Error {
    io::Error::new(kind, e)
}
