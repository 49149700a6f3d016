//! TCP implementation of the transport traits.
//!
//! Both peers wrap the stream in `Framed<TcpStream, FrameCodec>`, so
//! everything above this module deals in whole payloads. The framed
//! stream is split into read and write halves behind separate locks:
//! a receive blocked on the wire must not hold up a concurrent send
//! (broadcasts arrive from other connections' handler tasks).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::codec::Framed;

use crate::frame::DEFAULT_MAX_FRAME_LEN;
use crate::{Connection, ConnectionId, FrameCodec, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type FramedTcp = Framed<TcpStream, FrameCodec>;

/// A TCP [`Transport`] that listens for incoming framed connections.
pub struct TcpTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl TcpTransport {
    /// Binds a listener on the given address with the default frame cap.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with_max_frame_len(addr, DEFAULT_MAX_FRAME_LEN).await
    }

    /// Binds a listener that rejects frames larger than `max_frame_len`.
    pub async fn bind_with_max_frame_len(
        addr: &str,
        max_frame_len: usize,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            max_frame_len,
        })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let conn = TcpConnection::from_stream(stream, self.max_frame_len);
        tracing::debug!(id = %conn.id(), %addr, "accepted TCP connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A single framed TCP connection.
pub struct TcpConnection {
    id: ConnectionId,
    writer: Mutex<SplitSink<FramedTcp, Bytes>>,
    reader: Mutex<SplitStream<FramedTcp>>,
}

impl std::fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnection")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl TcpConnection {
    /// Connects to a remote peer with the default frame cap.
    ///
    /// Resolution and connect failures are reported to the caller only;
    /// nothing has reached the wire yet.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        Self::connect_with_max_frame_len(addr, DEFAULT_MAX_FRAME_LEN).await
    }

    /// Connects to a remote peer with an explicit frame cap.
    pub async fn connect_with_max_frame_len(
        addr: &str,
        max_frame_len: usize,
    ) -> Result<Self, TransportError> {
        let mut hosts = tokio::net::lookup_host(addr)
            .await
            .map_err(|_| TransportError::AddressResolution(addr.to_string()))?;
        let target = hosts
            .next()
            .ok_or_else(|| TransportError::AddressResolution(addr.to_string()))?;
        let stream = TcpStream::connect(target)
            .await
            .map_err(TransportError::ConnectFailed)?;
        let conn = Self::from_stream(stream, max_frame_len);
        tracing::debug!(id = %conn.id(), addr, "connected");
        Ok(conn)
    }

    /// Wraps an already-established stream in the frame codec.
    pub fn from_stream(stream: TcpStream, max_frame_len: usize) -> Self {
        // Frames are small and latency-sensitive; don't batch them.
        let _ = stream.set_nodelay(true);
        let framed = Framed::new(
            stream,
            FrameCodec::with_max_frame_len(max_frame_len),
        );
        let (writer, reader) = framed.split();
        Self {
            id: ConnectionId::new(
                NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            ),
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        }
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, payload: &[u8]) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .send(Bytes::copy_from_slice(payload))
            .await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        match self.reader.lock().await.next().await {
            Some(Ok(payload)) => Ok(Some(payload.to_vec())),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer.lock().await.close().await
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
