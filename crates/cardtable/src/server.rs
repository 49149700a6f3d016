//! `CardtableServer` builder and accept loop.
//!
//! The entry point for running a game server. It ties the layers
//! together: transport (frames) -> protocol (messages) -> session
//! (authoritative state), with one handler task per connection.

use std::sync::Arc;

use cardtable_session::{CardRules, Coordinator, RuleEngine, SyncMode};
use cardtable_transport::{
    DEFAULT_MAX_FRAME_LEN, TcpTransport, Transport,
};

use crate::CardtableError;
use crate::handler::{Broadcaster, handle_connection};

/// Runtime configuration for a server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,
    /// Whether responses carry full snapshots or incremental diffs.
    pub sync_mode: SyncMode,
    /// Per-frame payload cap.
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            sync_mode: SyncMode::default(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) coordinator: Coordinator,
    pub(crate) broadcaster: Broadcaster,
}

/// Builder for configuring and starting a Cardtable server.
///
/// # Example
///
/// ```rust,no_run
/// use cardtable::prelude::*;
///
/// # async fn run() -> Result<(), CardtableError> {
/// let server = CardtableServer::builder()
///     .bind("0.0.0.0:4000")
///     .sync_mode(SyncMode::Diff)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CardtableServerBuilder {
    config: ServerConfig,
    rules: Option<Arc<dyn RuleEngine>>,
}

impl CardtableServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            rules: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Selects full-state or diff responses.
    pub fn sync_mode(mut self, mode: SyncMode) -> Self {
        self.config.sync_mode = mode;
        self
    }

    /// Caps the payload size of a single frame.
    pub fn max_frame_len(mut self, max: usize) -> Self {
        self.config.max_frame_len = max;
        self
    }

    /// Swaps in a custom rule engine (default: [`CardRules`]).
    pub fn rules(mut self, rules: Arc<dyn RuleEngine>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Binds the transport and assembles the server.
    pub async fn build(self) -> Result<CardtableServer, CardtableError> {
        let transport = TcpTransport::bind_with_max_frame_len(
            &self.config.bind_addr,
            self.config.max_frame_len,
        )
        .await?;

        let rules = self
            .rules
            .unwrap_or_else(|| Arc::new(CardRules::default()));
        let state = Arc::new(ServerState {
            coordinator: Coordinator::new(
                rules,
                self.config.sync_mode.strategy(),
            ),
            broadcaster: Broadcaster::new(),
        });

        Ok(CardtableServer { transport, state })
    }
}

impl Default for CardtableServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Cardtable game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CardtableServer {
    transport: TcpTransport,
    state: Arc<ServerState>,
}

impl CardtableServer {
    /// Creates a new builder.
    pub fn builder() -> CardtableServerBuilder {
        CardtableServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Frames on one connection are processed strictly in arrival order;
    /// connections are independent of each other. Runs until the process
    /// is terminated.
    pub async fn run(mut self) -> Result<(), CardtableError> {
        tracing::info!("Cardtable server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
