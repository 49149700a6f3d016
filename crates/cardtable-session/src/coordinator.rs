//! The game session coordinator.
//!
//! Owns every [`GameSession`], routes one operation per game action to
//! the right session, and reaps sessions whose games have finished. The
//! map lock is held only for lookups and inserts, never across a session
//! operation, so mutations against different games proceed concurrently
//! while mutations against the same game serialize on that session's own
//! lock.

use std::collections::HashMap;
use std::sync::Arc;

use cardtable_state::{CardId, GameId, PlayerId};
use tokio::sync::Mutex;

use crate::{
    Action, ActionOutcome, CardRules, GameSession, RuleEngine, SessionError,
    StateSync, SyncMode,
};

/// Serializes concurrent player actions against per-game authoritative
/// state and turns them into state payloads.
pub struct Coordinator {
    games: Mutex<HashMap<GameId, Arc<GameSession>>>,
    rules: Arc<dyn RuleEngine>,
    sync: Arc<dyn StateSync>,
}

impl Coordinator {
    /// Creates a coordinator with explicit rules and sync strategy.
    pub fn new(rules: Arc<dyn RuleEngine>, sync: Arc<dyn StateSync>) -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
            rules,
            sync,
        }
    }

    /// Creates a coordinator with the stock rules and the given mode.
    pub fn with_mode(mode: SyncMode) -> Self {
        Self::new(Arc::new(CardRules::default()), mode.strategy())
    }

    /// Seats a player, creating the game on first join.
    ///
    /// The protocol has no separate create-game request; the first
    /// `join_game` for an unknown id brings the session into being.
    pub async fn join(
        &self,
        game_id: &GameId,
        player: &PlayerId,
    ) -> Result<ActionOutcome, SessionError> {
        let session = {
            let mut games = self.games.lock().await;
            games
                .entry(game_id.clone())
                .or_insert_with(|| {
                    tracing::info!(%game_id, "game created");
                    Arc::new(GameSession::new(game_id.clone()))
                })
                .clone()
        };
        session.join(player).await
    }

    /// Starts the game: deals hands and opens play.
    pub async fn start(
        &self,
        game_id: &GameId,
        player: &PlayerId,
    ) -> Result<ActionOutcome, SessionError> {
        self.act(game_id, player, Action::Start).await
    }

    /// Plays one card on behalf of a player.
    pub async fn play_card(
        &self,
        game_id: &GameId,
        player: &PlayerId,
        card_id: CardId,
    ) -> Result<ActionOutcome, SessionError> {
        self.act(game_id, player, Action::Play { card_id }).await
    }

    /// Draws `count` cards on behalf of a player.
    pub async fn draw_card(
        &self,
        game_id: &GameId,
        player: &PlayerId,
        count: u32,
    ) -> Result<ActionOutcome, SessionError> {
        self.act(game_id, player, Action::Draw { count }).await
    }

    /// Folds a player out of the game.
    pub async fn fold(
        &self,
        game_id: &GameId,
        player: &PlayerId,
    ) -> Result<ActionOutcome, SessionError> {
        self.act(game_id, player, Action::Fold).await
    }

    /// Returns the session for a game, if it exists.
    pub async fn session(&self, game_id: &GameId) -> Option<Arc<GameSession>> {
        self.games.lock().await.get(game_id).cloned()
    }

    /// Number of live (unreaped) games.
    pub async fn game_count(&self) -> usize {
        self.games.lock().await.len()
    }

    async fn act(
        &self,
        game_id: &GameId,
        player: &PlayerId,
        action: Action,
    ) -> Result<ActionOutcome, SessionError> {
        let session = self
            .session(game_id)
            .await
            .ok_or_else(|| SessionError::GameNotFound(game_id.clone()))?;
        let outcome = session
            .act(player, &action, self.rules.as_ref(), self.sync.as_ref())
            .await?;
        if outcome.finished {
            self.reap(game_id).await;
        }
        Ok(outcome)
    }

    /// Destroys a finished session.
    async fn reap(&self, game_id: &GameId) {
        if self.games.lock().await.remove(game_id).is_some() {
            tracing::info!(%game_id, "game finished, session reaped");
        }
    }
}
