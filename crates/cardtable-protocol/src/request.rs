//! Client-to-server requests.
//!
//! Every request carries the shared trio (`req_id`, `player_id`,
//! `game_id`) plus its variant-specific fields. The `req_id` is minted
//! by the sender, unique within its connection, and echoed back in the
//! matching response for correlation.

use std::fmt;

use cardtable_session::Coordinator;
use cardtable_state::{CardId, GameId, PlayerId};
use serde::{Deserialize, Serialize};

use crate::codec::{decode_with_registry, encode_with_token};
use crate::registry::request_registry;
use crate::{ProtocolError, Response};

/// A sender-minted correlation id, echoed back in the response.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

fn default_nof_cards() -> u32 {
    1
}

/// Join a game (creating it on first join).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinGame {
    pub req_id: RequestId,
    pub player_id: PlayerId,
    pub game_id: GameId,
}

/// Start a joined game: deal hands, open play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGame {
    pub req_id: RequestId,
    pub player_id: PlayerId,
    pub game_id: GameId,
}

/// Play one card from the sender's hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayCard {
    pub req_id: RequestId,
    pub player_id: PlayerId,
    pub game_id: GameId,
    pub card_id: CardId,
}

/// Draw cards from the pile. `nof_cards` defaults to 1 when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawCard {
    pub req_id: RequestId,
    pub player_id: PlayerId,
    pub game_id: GameId,
    #[serde(default = "default_nof_cards")]
    pub nof_cards: u32,
}

/// Retire from the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fold {
    pub req_id: RequestId,
    pub player_id: PlayerId,
    pub game_id: GameId,
}

/// The request family.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    JoinGame(JoinGame),
    StartGame(StartGame),
    PlayCard(PlayCard),
    DrawCard(DrawCard),
    Fold(Fold),
}

impl Request {
    /// The wire token identifying this variant.
    pub fn token(&self) -> &'static str {
        match self {
            Self::JoinGame(_) => "join_game",
            Self::StartGame(_) => "start_game",
            Self::PlayCard(_) => "play_card",
            Self::DrawCard(_) => "draw_card",
            Self::Fold(_) => "fold",
        }
    }

    /// The sender's correlation id.
    pub fn req_id(&self) -> RequestId {
        match self {
            Self::JoinGame(r) => r.req_id,
            Self::StartGame(r) => r.req_id,
            Self::PlayCard(r) => r.req_id,
            Self::DrawCard(r) => r.req_id,
            Self::Fold(r) => r.req_id,
        }
    }

    /// The acting player.
    pub fn player_id(&self) -> &PlayerId {
        match self {
            Self::JoinGame(r) => &r.player_id,
            Self::StartGame(r) => &r.player_id,
            Self::PlayCard(r) => &r.player_id,
            Self::DrawCard(r) => &r.player_id,
            Self::Fold(r) => &r.player_id,
        }
    }

    /// The target game.
    pub fn game_id(&self) -> &GameId {
        match self {
            Self::JoinGame(r) => &r.game_id,
            Self::StartGame(r) => &r.game_id,
            Self::PlayCard(r) => &r.game_id,
            Self::DrawCard(r) => &r.game_id,
            Self::Fold(r) => &r.game_id,
        }
    }

    /// Serializes this request into one frame payload.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::JoinGame(r) => encode_with_token(self.token(), r),
            Self::StartGame(r) => encode_with_token(self.token(), r),
            Self::PlayCard(r) => encode_with_token(self.token(), r),
            Self::DrawCard(r) => encode_with_token(self.token(), r),
            Self::Fold(r) => encode_with_token(self.token(), r),
        }
    }

    /// Rehydrates a request from a frame payload via the registry.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        decode_with_registry(request_registry(), payload)
    }

    /// Executes this request against the coordinator, producing the
    /// response for the initiator.
    ///
    /// Business rejections (unknown game, out-of-turn plays, cards not
    /// held) come back as `success = false` responses carrying the
    /// reason; they never surface as errors across the protocol
    /// boundary.
    pub async fn execute(&self, coordinator: &Coordinator) -> Response {
        let result = match self {
            Self::JoinGame(r) => {
                coordinator.join(&r.game_id, &r.player_id).await
            }
            Self::StartGame(r) => {
                coordinator.start(&r.game_id, &r.player_id).await
            }
            Self::PlayCard(r) => {
                coordinator
                    .play_card(&r.game_id, &r.player_id, r.card_id.clone())
                    .await
            }
            Self::DrawCard(r) => {
                coordinator
                    .draw_card(&r.game_id, &r.player_id, r.nof_cards)
                    .await
            }
            Self::Fold(r) => coordinator.fold(&r.game_id, &r.player_id).await,
        };

        match result {
            Ok(outcome) => {
                Response::ok(self.game_id().clone(), self.req_id(), outcome)
            }
            Err(reason) => Response::rejected(
                self.game_id().clone(),
                self.req_id(),
                reason.to_string(),
            ),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
