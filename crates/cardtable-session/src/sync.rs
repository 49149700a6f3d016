//! State synchronization strategies.
//!
//! After a mutation commits, the server answers with either the whole
//! snapshot or only the edits since the previous one. The two behaviors
//! live behind one trait and are chosen by runtime configuration, so no
//! conditional compilation leaks into the coordinator.

use std::sync::Arc;

use cardtable_state::{GameState, StateDiff, StateError, StatePayload};

/// Produces the state payload for a committed `prior -> next` mutation.
pub trait StateSync: Send + Sync + 'static {
    fn payload(
        &self,
        prior: &GameState,
        next: &GameState,
    ) -> Result<StatePayload, StateError>;
}

/// Always sends the complete post-mutation snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullStateSync;

impl StateSync for FullStateSync {
    fn payload(
        &self,
        _prior: &GameState,
        next: &GameState,
    ) -> Result<StatePayload, StateError> {
        Ok(StatePayload::Full(next.clone()))
    }
}

/// Sends only the edits between the pre- and post-mutation snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffSync;

impl StateSync for DiffSync {
    fn payload(
        &self,
        prior: &GameState,
        next: &GameState,
    ) -> Result<StatePayload, StateError> {
        Ok(StatePayload::Diff(StateDiff::between(prior, next)?))
    }
}

/// Configuration-level selector for the two stock strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Retransmit the full snapshot on every change.
    #[default]
    FullState,
    /// Propagate incremental diffs.
    Diff,
}

impl SyncMode {
    /// Materializes the strategy this mode names.
    pub fn strategy(self) -> Arc<dyn StateSync> {
        match self {
            Self::FullState => Arc::new(FullStateSync),
            Self::Diff => Arc::new(DiffSync),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardtable_state::{GameId, PlayerId, PlayerState};

    fn pair() -> (GameState, GameState) {
        let prior = GameState::new(GameId::new("G1"));
        let mut next = prior.clone();
        next.players.push(PlayerState::new(PlayerId::new("P1")));
        next.bump_version();
        (prior, next)
    }

    #[test]
    fn test_full_state_sync_returns_next_snapshot() {
        let (prior, next) = pair();
        let payload = FullStateSync.payload(&prior, &next).unwrap();
        assert_eq!(payload.as_full(), Some(&next));
    }

    #[test]
    fn test_diff_sync_payload_reconstructs_next() {
        let (prior, next) = pair();
        let payload = DiffSync.payload(&prior, &next).unwrap();
        let diff = payload.as_diff().expect("diff payload");
        assert_eq!(diff.apply_to(&prior).unwrap(), next);
    }

    #[test]
    fn test_mode_selects_strategy_at_runtime() {
        let (prior, next) = pair();
        let full = SyncMode::FullState.strategy();
        let diff = SyncMode::Diff.strategy();
        assert!(full.payload(&prior, &next).unwrap().as_full().is_some());
        assert!(diff.payload(&prior, &next).unwrap().as_diff().is_some());
    }
}
