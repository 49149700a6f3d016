//! Error types for the client layer.

use std::time::Duration;

use cardtable_protocol::ProtocolError;
use cardtable_state::StateError;
use cardtable_transport::TransportError;

/// Errors that can occur on the client side.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection did not become ready within the configured wait;
    /// the outgoing request was dropped, not queued.
    #[error("connection not ready within {0:?}")]
    NotReady(Duration),

    /// The connection failed before or after becoming ready.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A diff arrived before any full snapshot established a base.
    #[error("no base snapshot to apply a diff to")]
    NoBaseSnapshot,

    /// A transport-level failure (framing, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level failure (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Applying a state payload to the local replica failed.
    #[error(transparent)]
    State(#[from] StateError),
}
