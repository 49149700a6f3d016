//! Error types for the session layer.

use cardtable_state::{GameId, StateError};

/// Errors that can occur during session operations.
///
/// `Rejected` is the business-rule channel: it never crosses the protocol
/// boundary as a failure of the connection, only as a `success = false`
/// response carrying the reason.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The game does not exist (or has finished and been reaped).
    #[error("game {0} not found")]
    GameNotFound(GameId),

    /// The action is illegal given the current game state. The message is
    /// what the request initiator sees.
    #[error("{0}")]
    Rejected(String),

    /// Snapshotting or diffing the state failed.
    #[error(transparent)]
    State(#[from] StateError),
}
