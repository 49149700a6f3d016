//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// These are message-boundary errors: the receiver reports them and
/// keeps the connection alive. Whether the stream itself is still
/// usable is the transport's verdict, not this one.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into payload bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed payload, a missing required
    /// field, or a field of the wrong shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The payload names a `type` token no constructor is registered for.
    #[error("unknown message type {0:?}")]
    UnknownDiscriminant(String),

    /// The payload carries no `type` token at all.
    #[error("message has no type discriminant")]
    MissingDiscriminant,

    /// The message decoded but violates a protocol rule (e.g. a failed
    /// response carrying a state payload).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
