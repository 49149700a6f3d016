//! The rule-engine boundary and the built-in table rules.
//!
//! The coordinator consumes game rules only through [`RuleEngine`]:
//! "attempt to apply this action to this state on behalf of this player,
//! yielding either the new state or a rejection reason". [`CardRules`]
//! is the stock implementation; richer rule sets plug in behind the same
//! trait without the coordinator changing.

use cardtable_state::{Card, CardId, GamePhase, GameState, PlayerId};
use rand::seq::SliceRandom;

/// A game action, as seen by the rule engine.
///
/// Joining is membership management and stays with the coordinator; it
/// never reaches the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Begin the game: deal hands, fix the turn order.
    Start,
    /// Play one card from the acting player's hand.
    Play { card_id: CardId },
    /// Draw `count` cards from the draw pile.
    Draw { count: u32 },
    /// Retire from the game.
    Fold,
}

/// Validates an action against a state and produces the successor state.
///
/// Implementations never mutate in place: the input snapshot is the
/// pre-action truth, the returned snapshot the post-action truth, and the
/// coordinator owns swapping one for the other under the session lock.
/// A `String` error is a rejection reason for the request initiator.
pub trait RuleEngine: Send + Sync + 'static {
    fn validate_and_apply(
        &self,
        state: &GameState,
        player: &PlayerId,
        action: &Action,
    ) -> Result<GameState, String>;
}

/// The built-in turn-order rules.
///
/// Deliberately minimal: start deals `hand_size` cards to each seat from
/// a shuffled standard deck; on your turn you may play a card you hold
/// (to the discard pile), draw from the pile, or fold. Playing your last
/// card wins; so does being the last unfolded player. Drawing does not
/// pass the turn, playing and folding do.
#[derive(Debug, Clone)]
pub struct CardRules {
    pub hand_size: usize,
}

impl Default for CardRules {
    fn default() -> Self {
        Self { hand_size: 5 }
    }
}

impl CardRules {
    fn start(&self, state: &GameState) -> Result<GameState, String> {
        if state.players.len() < 2 {
            return Err(format!(
                "need at least 2 players to start, have {}",
                state.players.len()
            ));
        }
        let mut next = state.clone();
        let mut deck = Card::standard_deck();
        deck.shuffle(&mut rand::rng());
        for player in &mut next.players {
            player.hand = deck.split_off(deck.len() - self.hand_size);
        }
        next.draw_pile = deck;
        next.discard_pile.clear();
        next.turn = 0;
        next.phase = GamePhase::InProgress;
        Ok(next)
    }

    fn play(
        &self,
        state: &GameState,
        player: &PlayerId,
        card_id: &CardId,
    ) -> Result<GameState, String> {
        require_turn(state, player)?;
        let mut next = state.clone();
        let seat = next
            .player_mut(player)
            .ok_or_else(|| format!("player {player} is not in the game"))?;
        let at = seat
            .hand
            .iter()
            .position(|c| &c.id == card_id)
            .ok_or_else(|| "card not in hand".to_string())?;
        let card = seat.hand.remove(at);
        let emptied = seat.hand.is_empty();
        next.discard_pile.push(card);
        if emptied {
            finish_with_winner(&mut next, player);
        } else {
            next.advance_turn();
        }
        Ok(next)
    }

    fn draw(
        &self,
        state: &GameState,
        player: &PlayerId,
        count: u32,
    ) -> Result<GameState, String> {
        require_turn(state, player)?;
        if count == 0 {
            return Err("must draw at least one card".into());
        }
        let count = count as usize;
        if state.draw_pile.len() < count {
            return Err(format!(
                "draw pile has only {} cards",
                state.draw_pile.len()
            ));
        }
        let mut next = state.clone();
        let drawn = next.draw_pile.split_off(next.draw_pile.len() - count);
        let seat = next
            .player_mut(player)
            .ok_or_else(|| format!("player {player} is not in the game"))?;
        seat.hand.extend(drawn);
        Ok(next)
    }

    fn fold(
        &self,
        state: &GameState,
        player: &PlayerId,
    ) -> Result<GameState, String> {
        require_turn(state, player)?;
        let mut next = state.clone();
        let seat = next
            .player_mut(player)
            .ok_or_else(|| format!("player {player} is not in the game"))?;
        seat.folded = true;
        if next.active_players() == 1 {
            let winner = next
                .players
                .iter()
                .find(|p| !p.folded)
                .map(|p| p.id.clone());
            if let Some(winner) = winner {
                finish_with_winner(&mut next, &winner);
            }
        } else {
            next.advance_turn();
        }
        Ok(next)
    }
}

impl RuleEngine for CardRules {
    fn validate_and_apply(
        &self,
        state: &GameState,
        player: &PlayerId,
        action: &Action,
    ) -> Result<GameState, String> {
        match action {
            Action::Start => self.start(state),
            Action::Play { card_id } => self.play(state, player, card_id),
            Action::Draw { count } => self.draw(state, player, *count),
            Action::Fold => self.fold(state, player),
        }
    }
}

fn require_turn(state: &GameState, player: &PlayerId) -> Result<(), String> {
    if !state.is_turn(player) {
        return Err(format!("not {player}'s turn"));
    }
    Ok(())
}

fn finish_with_winner(state: &mut GameState, winner: &PlayerId) {
    if let Some(seat) = state.player_mut(winner) {
        seat.score += 1;
    }
    state.phase = GamePhase::Finished;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardtable_state::{GameId, PlayerState};

    fn two_player_game() -> GameState {
        let mut state = GameState::new(GameId::new("G1"));
        state.players.push(PlayerState::new(PlayerId::new("P1")));
        state.players.push(PlayerState::new(PlayerId::new("P2")));
        state
    }

    /// An in-progress game with deterministic hands (no shuffle involved).
    fn dealt_game() -> GameState {
        let mut state = two_player_game();
        let mut deck = Card::standard_deck();
        state.players[0].hand = deck.split_off(deck.len() - 3);
        state.players[1].hand = deck.split_off(deck.len() - 3);
        state.draw_pile = deck;
        state.phase = GamePhase::InProgress;
        state
    }

    #[test]
    fn test_start_deals_hands_and_moves_to_in_progress() {
        let rules = CardRules::default();
        let state = two_player_game();
        let next = rules
            .validate_and_apply(&state, &PlayerId::new("P1"), &Action::Start)
            .unwrap();
        assert_eq!(next.phase, GamePhase::InProgress);
        assert!(next.players.iter().all(|p| p.hand.len() == 5));
        assert_eq!(next.draw_pile.len(), 52 - 10);
        assert_eq!(next.turn, 0);
    }

    #[test]
    fn test_start_needs_two_players() {
        let rules = CardRules::default();
        let mut state = GameState::new(GameId::new("G1"));
        state.players.push(PlayerState::new(PlayerId::new("P1")));
        let err = rules
            .validate_and_apply(&state, &PlayerId::new("P1"), &Action::Start)
            .unwrap_err();
        assert!(err.contains("at least 2 players"));
    }

    #[test]
    fn test_play_moves_card_to_discard_and_passes_turn() {
        let rules = CardRules::default();
        let state = dealt_game();
        let card_id = state.players[0].hand[0].id.clone();
        let next = rules
            .validate_and_apply(
                &state,
                &PlayerId::new("P1"),
                &Action::Play {
                    card_id: card_id.clone(),
                },
            )
            .unwrap();
        assert_eq!(next.players[0].hand.len(), 2);
        assert_eq!(next.discard_pile.last().unwrap().id, card_id);
        assert!(next.is_turn(&PlayerId::new("P2")));
    }

    #[test]
    fn test_play_card_not_in_hand_is_rejected() {
        let rules = CardRules::default();
        let state = dealt_game();
        // P2 holds this card, not P1.
        let foreign = state.players[1].hand[0].id.clone();
        let err = rules
            .validate_and_apply(
                &state,
                &PlayerId::new("P1"),
                &Action::Play { card_id: foreign },
            )
            .unwrap_err();
        assert_eq!(err, "card not in hand");
    }

    #[test]
    fn test_play_out_of_turn_is_rejected() {
        let rules = CardRules::default();
        let state = dealt_game();
        let card_id = state.players[1].hand[0].id.clone();
        let err = rules
            .validate_and_apply(
                &state,
                &PlayerId::new("P2"),
                &Action::Play { card_id },
            )
            .unwrap_err();
        assert!(err.contains("turn"));
    }

    #[test]
    fn test_draw_keeps_the_turn() {
        let rules = CardRules::default();
        let state = dealt_game();
        let pile = state.draw_pile.len();
        let next = rules
            .validate_and_apply(
                &state,
                &PlayerId::new("P1"),
                &Action::Draw { count: 2 },
            )
            .unwrap();
        assert_eq!(next.players[0].hand.len(), 5);
        assert_eq!(next.draw_pile.len(), pile - 2);
        assert!(next.is_turn(&PlayerId::new("P1")), "drawing keeps the turn");
    }

    #[test]
    fn test_draw_more_than_pile_is_rejected() {
        let rules = CardRules::default();
        let mut state = dealt_game();
        state.draw_pile.truncate(1);
        let err = rules
            .validate_and_apply(
                &state,
                &PlayerId::new("P1"),
                &Action::Draw { count: 2 },
            )
            .unwrap_err();
        assert!(err.contains("draw pile has only 1"));
    }

    #[test]
    fn test_playing_last_card_wins_and_finishes() {
        let rules = CardRules::default();
        let mut state = dealt_game();
        state.players[0].hand.truncate(1);
        let last = state.players[0].hand[0].id.clone();
        let next = rules
            .validate_and_apply(
                &state,
                &PlayerId::new("P1"),
                &Action::Play { card_id: last },
            )
            .unwrap();
        assert_eq!(next.phase, GamePhase::Finished);
        assert_eq!(next.players[0].score, 1);
    }

    #[test]
    fn test_fold_until_one_remains_finishes_the_game() {
        let rules = CardRules::default();
        let state = dealt_game();
        let next = rules
            .validate_and_apply(&state, &PlayerId::new("P1"), &Action::Fold)
            .unwrap();
        assert_eq!(next.phase, GamePhase::Finished, "one of two remains");
        assert_eq!(next.players[1].score, 1);
        assert!(next.players[0].folded);
    }
}
