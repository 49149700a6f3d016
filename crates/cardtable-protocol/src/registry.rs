//! The message registry: wire token -> constructor, fixed at startup.
//!
//! Each message family (requests, responses) has one process-wide table
//! mapping its `type` tokens to decode functions. The tables are built
//! once inside a `OnceLock` and never mutated afterwards, so lookups are
//! plain reads from every thread. Adding a message variant means adding
//! its enum arm and one `.with(...)` line here; nothing else changes.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value;

use crate::request::{DrawCard, Fold, JoinGame, PlayCard, StartGame};
use crate::response::{FullStateMsg, RequestResponse, StateDiffMsg};
use crate::{ProtocolError, Request, Response};

/// A decode constructor: rehydrates one variant from a decoded payload.
type DecodeFn<T> = fn(Value) -> Result<T, ProtocolError>;

/// Immutable-after-init mapping from wire token to constructor.
pub struct Registry<T> {
    decoders: HashMap<&'static str, DecodeFn<T>>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers a constructor for a token (init-time only; the registry
    /// is never exposed mutably once published).
    fn with(mut self, token: &'static str, decode: DecodeFn<T>) -> Self {
        self.decoders.insert(token, decode);
        self
    }

    /// Looks up the payload's `type` token and runs its constructor.
    pub fn decode_value(&self, payload: Value) -> Result<T, ProtocolError> {
        let token = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingDiscriminant)?
            .to_string();
        let decode = self
            .decoders
            .get(token.as_str())
            .ok_or(ProtocolError::UnknownDiscriminant(token))?;
        decode(payload)
    }

    /// Returns `true` if a constructor is registered for this token.
    pub fn knows(&self, token: &str) -> bool {
        self.decoders.contains_key(token)
    }
}

/// Decodes a variant struct, ignoring the already-consumed `type` key.
fn variant<V: serde::de::DeserializeOwned>(
    payload: Value,
) -> Result<V, ProtocolError> {
    serde_json::from_value(payload).map_err(ProtocolError::Decode)
}

/// The request-family registry.
pub fn request_registry() -> &'static Registry<Request> {
    static REGISTRY: OnceLock<Registry<Request>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Registry::new()
            .with("join_game", |p| {
                Ok(Request::JoinGame(variant::<JoinGame>(p)?))
            })
            .with("start_game", |p| {
                Ok(Request::StartGame(variant::<StartGame>(p)?))
            })
            .with("play_card", |p| {
                Ok(Request::PlayCard(variant::<PlayCard>(p)?))
            })
            .with("draw_card", |p| {
                Ok(Request::DrawCard(variant::<DrawCard>(p)?))
            })
            .with("fold", |p| Ok(Request::Fold(variant::<Fold>(p)?)))
    })
}

/// The response-family registry.
pub fn response_registry() -> &'static Registry<Response> {
    static REGISTRY: OnceLock<Registry<Response>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Registry::new()
            .with("request_response", |p| {
                Ok(Response::RequestResponse(variant::<RequestResponse>(p)?))
            })
            .with("full_state_msg", |p| {
                Ok(Response::FullState(variant::<FullStateMsg>(p)?))
            })
            .with("state_diff_msg", |p| {
                Ok(Response::StateDiff(variant::<StateDiffMsg>(p)?))
            })
    })
}
