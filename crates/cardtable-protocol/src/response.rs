//! Server-to-client responses.
//!
//! `request_response` answers one request (echoing its `req_id`);
//! `full_state_msg` and `state_diff_msg` are unsolicited broadcasts that
//! keep the other players at the table current.

use cardtable_session::ActionOutcome;
use cardtable_state::{GameId, GameState, StateDiff, StatePayload};
use serde::{Deserialize, Serialize};

use crate::codec::{decode_with_registry, encode_with_token};
use crate::registry::response_registry;
use crate::{ProtocolError, RequestId};

/// The answer to one request.
///
/// Invariant: `success == true` implies `state` present and `error`
/// absent; `success == false` implies `error` present and `state`
/// absent. Build these through [`Response::ok`] / [`Response::rejected`]
/// so the invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResponse {
    pub game_id: GameId,
    pub req_id: RequestId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StatePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A complete snapshot broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullStateMsg {
    pub game_id: GameId,
    pub state: GameState,
}

/// An incremental snapshot broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDiffMsg {
    pub game_id: GameId,
    pub diff: StateDiff,
}

/// The response family.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    RequestResponse(RequestResponse),
    FullState(FullStateMsg),
    StateDiff(StateDiffMsg),
}

impl Response {
    /// The wire token identifying this variant.
    pub fn token(&self) -> &'static str {
        match self {
            Self::RequestResponse(_) => "request_response",
            Self::FullState(_) => "full_state_msg",
            Self::StateDiff(_) => "state_diff_msg",
        }
    }

    /// The game this response concerns.
    pub fn game_id(&self) -> &GameId {
        match self {
            Self::RequestResponse(r) => &r.game_id,
            Self::FullState(r) => &r.game_id,
            Self::StateDiff(r) => &r.game_id,
        }
    }

    /// A successful answer carrying the committed state payload.
    pub fn ok(
        game_id: GameId,
        req_id: RequestId,
        outcome: ActionOutcome,
    ) -> Self {
        Self::RequestResponse(RequestResponse {
            game_id,
            req_id,
            success: true,
            state: Some(outcome.payload),
            error: None,
        })
    }

    /// A failed answer carrying the rejection reason.
    pub fn rejected(
        game_id: GameId,
        req_id: RequestId,
        reason: impl Into<String>,
    ) -> Self {
        Self::RequestResponse(RequestResponse {
            game_id,
            req_id,
            success: false,
            state: None,
            error: Some(reason.into()),
        })
    }

    /// The broadcast form of a state payload, for the other players.
    pub fn broadcast(game_id: GameId, payload: StatePayload) -> Self {
        match payload {
            StatePayload::Full(state) => {
                Self::FullState(FullStateMsg { game_id, state })
            }
            StatePayload::Diff(diff) => {
                Self::StateDiff(StateDiffMsg { game_id, diff })
            }
        }
    }

    /// Serializes this response into one frame payload.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::RequestResponse(r) => encode_with_token(self.token(), r),
            Self::FullState(r) => encode_with_token(self.token(), r),
            Self::StateDiff(r) => encode_with_token(self.token(), r),
        }
    }

    /// Rehydrates a response from a frame payload via the registry,
    /// then checks the success/state/error invariant.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let response = decode_with_registry(response_registry(), payload)?;
        if let Response::RequestResponse(r) = &response {
            if r.success && (r.state.is_none() || r.error.is_some()) {
                return Err(ProtocolError::InvalidMessage(
                    "successful response must carry state and no error".into(),
                ));
            }
            if !r.success && (r.error.is_none() || r.state.is_some()) {
                return Err(ProtocolError::InvalidMessage(
                    "failed response must carry an error and no state".into(),
                ));
            }
        }
        Ok(response)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cardtable_state::{DiffKind, DiffOp, Path, PlayerId, PlayerState};

    fn outcome_with_full_state() -> ActionOutcome {
        let mut state = GameState::new(GameId::new("G1"));
        state.players.push(PlayerState::new(PlayerId::new("P1")));
        state.bump_version();
        ActionOutcome {
            players: vec![PlayerId::new("P1")],
            finished: false,
            payload: StatePayload::Full(state),
        }
    }

    #[test]
    fn test_ok_response_wire_shape() {
        let resp = Response::ok(
            GameId::new("G1"),
            RequestId(9),
            outcome_with_full_state(),
        );
        let json: serde_json::Value =
            serde_json::from_slice(&resp.encode().unwrap()).unwrap();
        assert_eq!(json["type"], "request_response");
        assert_eq!(json["game_id"], "G1");
        assert_eq!(json["req_id"], 9);
        assert_eq!(json["success"], true);
        assert_eq!(json["state"]["kind"], "full");
        assert!(json.get("error").is_none(), "no error key on success");
    }

    #[test]
    fn test_rejected_response_wire_shape() {
        let resp =
            Response::rejected(GameId::new("G1"), RequestId(9), "card not in hand");
        let json: serde_json::Value =
            serde_json::from_slice(&resp.encode().unwrap()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "card not in hand");
        assert!(json.get("state").is_none(), "no state key on failure");
    }

    #[test]
    fn test_every_variant_round_trips() {
        let diff = StateDiff(vec![DiffOp {
            path: Path::root(),
            kind: DiffKind::Changed {
                value: serde_json::json!({"turn": 1}),
            },
        }]);
        let variants = vec![
            Response::ok(
                GameId::new("G1"),
                RequestId(1),
                outcome_with_full_state(),
            ),
            Response::rejected(GameId::new("G1"), RequestId(2), "nope"),
            Response::FullState(FullStateMsg {
                game_id: GameId::new("G1"),
                state: GameState::new(GameId::new("G1")),
            }),
            Response::StateDiff(StateDiffMsg {
                game_id: GameId::new("G1"),
                diff,
            }),
        ];
        for resp in variants {
            let bytes = resp.encode().unwrap();
            let back = Response::decode(&bytes).unwrap();
            assert_eq!(resp, back, "round trip must preserve every field");
        }
    }

    #[test]
    fn test_diff_payload_round_trips_inside_response() {
        let mut prior = GameState::new(GameId::new("G1"));
        prior.players.push(PlayerState::new(PlayerId::new("P1")));
        let mut next = prior.clone();
        next.players[0].score = 3;
        next.bump_version();

        let diff = StateDiff::between(&prior, &next).unwrap();
        let resp = Response::StateDiff(StateDiffMsg {
            game_id: GameId::new("G1"),
            diff,
        });
        let back = Response::decode(&resp.encode().unwrap()).unwrap();
        let Response::StateDiff(msg) = back else {
            panic!("expected state_diff_msg");
        };
        assert_eq!(msg.diff.apply_to(&prior).unwrap(), next);
    }

    #[test]
    fn test_success_without_state_violates_invariant() {
        let payload = br#"{"type":"request_response","game_id":"G1","req_id":1,"success":true}"#;
        assert!(matches!(
            Response::decode(payload),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_failure_without_error_violates_invariant() {
        let payload = br#"{"type":"request_response","game_id":"G1","req_id":1,"success":false}"#;
        assert!(matches!(
            Response::decode(payload),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_unknown_discriminant_is_an_error() {
        let payload = br#"{"type":"mind_reading","game_id":"G1"}"#;
        assert!(matches!(
            Response::decode(payload),
            Err(ProtocolError::UnknownDiscriminant(_))
        ));
    }
}
