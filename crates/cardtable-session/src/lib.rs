//! Game session coordination for Cardtable.
//!
//! The server side of "what happens when a request arrives":
//!
//! - [`Coordinator`] — owns every game, one operation per game action.
//! - [`GameSession`] — one game's authoritative state behind its own
//!   mutation lock.
//! - [`RuleEngine`] / [`CardRules`] — the boundary to the card-game
//!   rules, consumed only as validate-and-apply.
//! - [`StateSync`] with [`FullStateSync`] and [`DiffSync`] — whether
//!   responses carry whole snapshots or incremental diffs.

mod coordinator;
mod error;
mod rules;
mod session;
mod sync;

pub use coordinator::Coordinator;
pub use error::SessionError;
pub use rules::{Action, CardRules, RuleEngine};
pub use session::{ActionOutcome, GameSession};
pub use sync::{DiffSync, FullStateSync, StateSync, SyncMode};
