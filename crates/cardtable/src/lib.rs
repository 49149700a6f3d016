//! # Cardtable
//!
//! Network synchronization for a multiplayer turn-based card game: a
//! length-prefixed message protocol carrying typed requests and
//! responses over TCP, with per-game serialized mutation and a choice of
//! full-snapshot or diff-based state propagation.
//!
//! This meta crate assembles the layers into a runnable server:
//!
//! ```text
//! transport (frames) -> protocol (messages) -> session (state)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cardtable::prelude::*;
//!
//! # async fn run() -> Result<(), CardtableError> {
//! let server = CardtableServer::builder()
//!     .bind("0.0.0.0:4000")
//!     .sync_mode(SyncMode::Diff)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::CardtableError;
pub use server::{CardtableServer, CardtableServerBuilder, ServerConfig};

/// The names most servers and tests want in scope.
pub mod prelude {
    pub use crate::{
        CardtableError, CardtableServer, CardtableServerBuilder, ServerConfig,
    };
    pub use cardtable_protocol::{
        CardId, GameId, PlayerId, Request, RequestId, Response,
    };
    pub use cardtable_session::{
        Action, CardRules, Coordinator, RuleEngine, SyncMode,
    };
    pub use cardtable_state::{GamePhase, GameState, StateDiff, StatePayload};
}
