//! Wire protocol for Cardtable.
//!
//! The "language" both peers speak, one layer above raw frames:
//!
//! - **Requests** ([`Request`]) — what clients ask for.
//! - **Responses** ([`Response`]) — answers and state broadcasts.
//! - **Registry** ([`request_registry`], [`response_registry`]) — wire
//!   token to constructor, fixed at process start.
//!
//! Every message travels as one frame whose payload is a JSON object
//! with a `type` discriminant. This crate does not know about
//! connections; it turns payload bytes into typed messages and back,
//! and (server side) dispatches a request against the coordinator.

mod codec;
mod error;
mod registry;
mod request;
mod response;

pub use error::ProtocolError;
pub use registry::{Registry, request_registry, response_registry};
pub use request::{
    DrawCard, Fold, JoinGame, PlayCard, Request, RequestId, StartGame,
};
pub use response::{FullStateMsg, RequestResponse, Response, StateDiffMsg};

// The identifiers live with the state crate; re-export them so protocol
// users need only one import path.
pub use cardtable_state::{CardId, GameId, PlayerId};
