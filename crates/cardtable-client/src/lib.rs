//! Client side of the Cardtable protocol.
//!
//! - [`Client`] — connects, mints request ids, sends requests once the
//!   connection is ready.
//! - [`ClientEvent`] — the single channel everything network-side
//!   arrives on: messages, status changes, errors.
//! - [`ClientGame`] — the local replica, advanced only by the
//!   application task that owns it.

mod client;
mod error;
mod replica;

pub use client::{Client, ClientConfig, ClientEvent};
pub use error::ClientError;
pub use replica::{Applied, ClientGame};
