//! Game state and state synchronization primitives for Cardtable.
//!
//! This crate owns the two halves of "what does the game look like":
//!
//! - **Snapshots** ([`GameState`] and friends) — the complete, versioned
//!   description of one game.
//! - **Diffs** ([`StateDiff`]) — minimal edit lists that transform one
//!   snapshot into another, so the server can propagate incremental
//!   changes instead of retransmitting everything.
//!
//! It knows nothing about the wire or about rules; it is the vocabulary
//! both the protocol and the session layers share.

mod diff;
mod error;
mod state;

pub use diff::{DiffKind, DiffOp, Path, Seg, StateDiff};
pub use error::StateError;
pub use state::{
    Card, CardId, GameId, GamePhase, GameState, PlayerId, PlayerState, Suit,
};

use serde::{Deserialize, Serialize};

/// The state payload a response carries: either the whole snapshot or
/// just the edits since the previous one.
///
/// This is an explicit tagged type rather than "a snapshot that might be
/// null" so absence, full, and diff are three distinct wire shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StatePayload {
    /// A complete snapshot; the receiver replaces its copy.
    Full(GameState),
    /// Edits relative to the receiver's current copy.
    Diff(StateDiff),
}

impl StatePayload {
    /// Returns the full snapshot, if this payload carries one.
    pub fn as_full(&self) -> Option<&GameState> {
        match self {
            Self::Full(state) => Some(state),
            Self::Diff(_) => None,
        }
    }

    /// Returns the diff, if this payload carries one.
    pub fn as_diff(&self) -> Option<&StateDiff> {
        match self {
            Self::Full(_) => None,
            Self::Diff(diff) => Some(diff),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_payload_wire_shapes_are_distinct() {
        let full = StatePayload::Full(GameState::new(GameId::new("G1")));
        let diff = StatePayload::Diff(StateDiff::default());

        let full_json: serde_json::Value =
            serde_json::to_value(&full).unwrap();
        let diff_json: serde_json::Value =
            serde_json::to_value(&diff).unwrap();

        assert_eq!(full_json["kind"], "full");
        assert_eq!(diff_json["kind"], "diff");
    }

    #[test]
    fn test_state_payload_round_trip() {
        let payload = StatePayload::Full(GameState::new(GameId::new("G1")));
        let bytes = serde_json::to_vec(&payload).unwrap();
        let back: StatePayload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload, back);
    }
}
