//! A single game session: one authoritative state behind one lock.
//!
//! Every mutating entry point acquires the session's mutex for the whole
//! validate-mutate-diff sequence, so at most one mutation is in flight
//! per game at any time. The lock is released on every exit path,
//! validation failures included, by the guard going out of scope.

use cardtable_state::{
    GameId, GamePhase, GameState, PlayerId, PlayerState, StatePayload,
};
use tokio::sync::Mutex;

use crate::{Action, RuleEngine, SessionError, StateSync};

/// What a committed (or attempted) mutation produced, beyond the state
/// payload itself: who should hear about it and whether the game ended.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// Full snapshot or diff, per the configured sync strategy.
    pub payload: StatePayload,
    /// Everyone seated at the table when the mutation committed.
    pub players: Vec<PlayerId>,
    /// `true` if this mutation moved the game to `Finished`.
    pub finished: bool,
}

/// The server-owned authoritative instance of one game.
pub struct GameSession {
    game_id: GameId,
    state: Mutex<GameState>,
}

impl GameSession {
    /// Creates a fresh session waiting for players.
    pub fn new(game_id: GameId) -> Self {
        let state = GameState::new(game_id.clone());
        Self {
            game_id,
            state: Mutex::new(state),
        }
    }

    /// Returns the game's id.
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Clones the current snapshot (read-only peek, e.g. for late joins).
    pub async fn snapshot(&self) -> GameState {
        self.state.lock().await.clone()
    }

    /// Seats a player at the table.
    ///
    /// Membership is coordinator business, not rules business, so this
    /// does not consult the rule engine. Allowed only while the game is
    /// waiting for players.
    ///
    /// Join payloads are always full snapshots, whatever the sync mode:
    /// the joiner has no prior snapshot a diff could apply to, and the
    /// broadcast gives everyone at the table the same base to diff
    /// against from here on.
    pub async fn join(
        &self,
        player: &PlayerId,
    ) -> Result<ActionOutcome, SessionError> {
        let mut state = self.state.lock().await;
        if !state.phase.is_joinable() {
            return Err(SessionError::Rejected(format!(
                "cannot join game {} in phase {}",
                self.game_id, state.phase
            )));
        }
        if state.has_player(player) {
            return Err(SessionError::Rejected(format!(
                "player {player} already joined game {}",
                self.game_id
            )));
        }

        state.players.push(PlayerState::new(player.clone()));
        state.bump_version();
        let payload = StatePayload::Full(state.clone());

        tracing::info!(
            game_id = %self.game_id,
            %player,
            players = state.players.len(),
            "player joined"
        );
        Ok(outcome(&state, payload))
    }

    /// Runs one game action through the rule engine and commits the
    /// result, all under the session lock.
    pub async fn act(
        &self,
        player: &PlayerId,
        action: &Action,
        rules: &dyn RuleEngine,
        sync: &dyn StateSync,
    ) -> Result<ActionOutcome, SessionError> {
        let mut state = self.state.lock().await;

        // Phase gating happens here, before the rules ever see the
        // action; out-of-phase requests are rejections, not no-ops.
        let phase_ok = match action {
            Action::Start => state.phase.is_joinable(),
            _ => state.phase.is_active(),
        };
        if !phase_ok {
            return Err(SessionError::Rejected(format!(
                "cannot {} game {} in phase {}",
                action_name(action),
                self.game_id,
                state.phase
            )));
        }
        if !state.has_player(player) {
            return Err(SessionError::Rejected(format!(
                "player {player} is not part of game {}",
                self.game_id
            )));
        }

        let mut next = rules
            .validate_and_apply(&state, player, action)
            .map_err(SessionError::Rejected)?;
        next.bump_version();
        let payload = sync.payload(&state, &next)?;
        *state = next;

        tracing::debug!(
            game_id = %self.game_id,
            %player,
            action = action_name(action),
            version = state.version,
            phase = %state.phase,
            "action committed"
        );
        Ok(outcome(&state, payload))
    }
}

fn outcome(state: &GameState, payload: StatePayload) -> ActionOutcome {
    ActionOutcome {
        payload,
        players: state.players.iter().map(|p| p.id.clone()).collect(),
        finished: state.phase == GamePhase::Finished,
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Start => "start",
        Action::Play { .. } => "play",
        Action::Draw { .. } => "draw",
        Action::Fold => "fold",
    }
}
