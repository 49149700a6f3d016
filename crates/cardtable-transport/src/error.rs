//! Error types for the transport layer.

/// Errors that can occur while framing bytes or moving them over TCP.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The length prefix of an incoming frame is unusable: no `:`
    /// delimiter within the bounded digit prefix, or a non-digit byte
    /// before the delimiter.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The stream ended while a frame's payload was still incomplete.
    /// Terminal for the connection; the partial frame is discarded.
    #[error("truncated frame: stream closed {got} bytes into a {want}-byte payload")]
    TruncatedFrame { want: usize, got: usize },

    /// A frame declared (or was asked to carry) more bytes than the
    /// configured maximum.
    #[error("frame of {len} bytes exceeds maximum of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// The peer address could not be resolved before connecting.
    #[error("address resolution failed for {0}")]
    AddressResolution(String),

    /// Establishing the TCP connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Sending data failed on a live connection.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed on a live connection.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// An I/O error surfaced by the framed stream itself.
    /// The `#[from]` conversion is required by `tokio_util::codec::Decoder`.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
