//! The client-side state replica.
//!
//! A [`ClientGame`] is a possibly-stale read copy of one game,
//! reconstructed purely from received messages: full snapshots replace
//! it, diffs patch it, and failed responses leave it untouched. It is
//! meant to be owned by a single task (the application's state owner),
//! with the reader task feeding it through the event channel.

use cardtable_protocol::{GameId, PlayerId, Response};
use cardtable_state::{Card, GameState, StatePayload};

use crate::ClientError;

/// What applying a response did to the replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The replica advanced to a new snapshot.
    Updated,
    /// The server rejected the request; the replica is unchanged.
    /// Carries the server's human-readable reason.
    Rejected(String),
    /// The message concerned another game; the replica is unchanged.
    Ignored,
}

/// A local, read-only copy of one game's state.
#[derive(Debug, Clone)]
pub struct ClientGame {
    game_id: GameId,
    state: Option<GameState>,
}

impl ClientGame {
    /// Creates an empty replica for a game; the first full snapshot
    /// (every join response carries one) establishes the base.
    pub fn new(game_id: GameId) -> Self {
        Self {
            game_id,
            state: None,
        }
    }

    /// The game this replica tracks.
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// The current snapshot, if one has been established.
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Convenience view of one player's hand.
    pub fn hand(&self, player: &PlayerId) -> Option<&[Card]> {
        self.state
            .as_ref()?
            .player(player)
            .map(|p| p.hand.as_slice())
    }

    /// Processes one received response against this replica.
    ///
    /// Dispatches on the response variant: answers apply their payload
    /// on success and change nothing on failure; state broadcasts apply
    /// directly. Messages for other games are ignored.
    pub fn apply(&mut self, response: &Response) -> Result<Applied, ClientError> {
        if response.game_id() != &self.game_id {
            return Ok(Applied::Ignored);
        }
        match response {
            Response::RequestResponse(r) => {
                if !r.success {
                    let reason = r
                        .error
                        .clone()
                        .unwrap_or_else(|| "unspecified error".to_string());
                    return Ok(Applied::Rejected(reason));
                }
                match &r.state {
                    Some(payload) => self.apply_payload(payload),
                    // Decode-side validation makes this unreachable from
                    // the wire; tolerate hand-built responses.
                    None => Ok(Applied::Updated),
                }
            }
            Response::FullState(msg) => {
                self.state = Some(msg.state.clone());
                Ok(Applied::Updated)
            }
            Response::StateDiff(msg) => {
                self.apply_payload(&StatePayload::Diff(msg.diff.clone()))
            }
        }
    }

    fn apply_payload(
        &mut self,
        payload: &StatePayload,
    ) -> Result<Applied, ClientError> {
        match payload {
            StatePayload::Full(state) => {
                self.state = Some(state.clone());
                Ok(Applied::Updated)
            }
            StatePayload::Diff(diff) => {
                let base =
                    self.state.as_ref().ok_or(ClientError::NoBaseSnapshot)?;
                self.state = Some(diff.apply_to(base)?);
                Ok(Applied::Updated)
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cardtable_protocol::{
        FullStateMsg, RequestId, RequestResponse, StateDiffMsg,
    };
    use cardtable_state::{PlayerState, StateDiff};

    fn base_state() -> GameState {
        let mut state = GameState::new(GameId::new("G1"));
        state.players.push(PlayerState::new(PlayerId::new("P1")));
        state.players.push(PlayerState::new(PlayerId::new("P2")));
        state.draw_pile = Card::standard_deck();
        state.version = 2;
        state
    }

    fn ok_response(payload: StatePayload) -> Response {
        Response::RequestResponse(RequestResponse {
            game_id: GameId::new("G1"),
            req_id: RequestId(1),
            success: true,
            state: Some(payload),
            error: None,
        })
    }

    #[test]
    fn test_full_snapshot_establishes_and_replaces_state() {
        let mut replica = ClientGame::new(GameId::new("G1"));
        assert!(replica.state().is_none());

        let applied = replica
            .apply(&ok_response(StatePayload::Full(base_state())))
            .unwrap();
        assert_eq!(applied, Applied::Updated);
        assert_eq!(replica.state().unwrap().version, 2);
    }

    #[test]
    fn test_draw_response_grows_local_hand_by_exactly_two() {
        let mut replica = ClientGame::new(GameId::new("G1"));
        let prior = base_state();
        replica
            .apply(&ok_response(StatePayload::Full(prior.clone())))
            .unwrap();

        // Server-side mutation: P1 draws two cards.
        let mut next = prior.clone();
        for _ in 0..2 {
            let card = next.draw_pile.pop().unwrap();
            next.player_mut(&PlayerId::new("P1")).unwrap().hand.push(card);
        }
        next.bump_version();

        let diff = StateDiff::between(&prior, &next).unwrap();
        replica
            .apply(&ok_response(StatePayload::Diff(diff)))
            .unwrap();

        assert_eq!(
            replica.hand(&PlayerId::new("P1")).unwrap().len(),
            2,
            "local hand view must grow by exactly the drawn cards"
        );
        assert_eq!(replica.state().unwrap(), &next);
    }

    #[test]
    fn test_rejection_leaves_replica_untouched() {
        let mut replica = ClientGame::new(GameId::new("G1"));
        replica
            .apply(&ok_response(StatePayload::Full(base_state())))
            .unwrap();
        let before = replica.state().unwrap().clone();

        let rejection = Response::RequestResponse(RequestResponse {
            game_id: GameId::new("G1"),
            req_id: RequestId(2),
            success: false,
            state: None,
            error: Some("card not in hand".to_string()),
        });
        let applied = replica.apply(&rejection).unwrap();
        assert_eq!(applied, Applied::Rejected("card not in hand".into()));
        assert_eq!(replica.state().unwrap(), &before);
    }

    #[test]
    fn test_diff_before_any_snapshot_is_an_error() {
        let mut replica = ClientGame::new(GameId::new("G1"));
        let msg = Response::StateDiff(StateDiffMsg {
            game_id: GameId::new("G1"),
            diff: StateDiff::default(),
        });
        assert!(matches!(
            replica.apply(&msg),
            Err(ClientError::NoBaseSnapshot)
        ));
    }

    #[test]
    fn test_messages_for_other_games_are_ignored() {
        let mut replica = ClientGame::new(GameId::new("G1"));
        let msg = Response::FullState(FullStateMsg {
            game_id: GameId::new("G2"),
            state: base_state(),
        });
        assert_eq!(replica.apply(&msg).unwrap(), Applied::Ignored);
        assert!(replica.state().is_none());
    }
}
