//! Raw TCP transport with delimiter framing.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::{
    Connection, ConnectionId, Framer, FramingConfig, RawMessage, Transport, TransportError,
};

/// Size of a single socket read.
const READ_CHUNK: usize = 4096;

/// A TCP [`Transport`] whose connections are framed with `framing`.
pub struct TcpTransport {
    listener: TcpListener,
    framing: FramingConfig,
    shut_down: AtomicBool,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str, framing: FramingConfig) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            framing,
            shut_down: AtomicBool::new(false),
        })
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
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

        let conn = TcpConnection::new(stream, addr, self.framing);
        tracing::debug!(id = %conn.id, %addr, "accepted TCP connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            tracing::info!(addr = ?self.listener.local_addr().ok(), "TCP transport shut down");
        }
        Ok(())
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Receive half of a connection together with its framing state.
struct FramedReader {
    half: OwnedReadHalf,
    framer: Framer,
    pending: VecDeque<RawMessage>,
}

/// A single framed TCP connection.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    framing: FramingConfig,
    reader: Mutex<FramedReader>,
    writer: Mutex<OwnedWriteHalf>,
    closed: AtomicBool,
}

impl TcpConnection {
    /// Wraps an already connected stream.
    pub fn new(stream: TcpStream, peer: SocketAddr, framing: FramingConfig) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            id: ConnectionId::next(),
            peer,
            framing,
            reader: Mutex::new(FramedReader {
                half: read_half,
                framer: Framer::new(framing),
                pending: VecDeque::new(),
            }),
            writer: Mutex::new(write_half),
            closed: AtomicBool::new(false),
        }
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed(format!(
                "{} to {} was closed",
                self.id, self.peer
            )));
        }
        Ok(())
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.ensure_open()?;
        let bytes = self.framing.frame(data);
        self.writer
            .lock()
            .await
            .write_all(&bytes)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<RawMessage>, Self::Error> {
        self.ensure_open()?;
        let mut guard = self.reader.lock().await;
        let FramedReader {
            half,
            framer,
            pending,
        } = &mut *guard;

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(message) = pending.pop_front() {
                return Ok(Some(message));
            }

            let read = half
                .read(&mut chunk)
                .await
                .map_err(TransportError::ReceiveFailed)?;

            if read == 0 {
                let buffered = framer.buffered();
                if buffered > 0 {
                    framer.reset();
                    return Err(TransportError::EndOfStream { buffered });
                }
                return Ok(None);
            }

            pending.extend(framer.feed(&chunk[..read])?);
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
