//! Unified error type for the Cardtable server.

use cardtable_protocol::ProtocolError;
use cardtable_session::SessionError;
use cardtable_state::StateError;
use cardtable_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CardtableError {
    /// A transport-level error (framing, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown discriminant).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown game, rejected action).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A state-level error (snapshotting, diff application).
    #[error(transparent)]
    State(#[from] StateError),
}
