//! The client connector.
//!
//! [`Client::connect`] starts connecting in the background and returns
//! immediately, together with the event channel. A dedicated reader task
//! decodes incoming frames and hands every message and status change to
//! that single channel; the application's state owner drains it and is
//! the only thing that touches [`ClientGame`](crate::ClientGame). The
//! reader never mutates shared state itself, so network-driven updates
//! cannot race user-driven actions.
//!
//! Outgoing requests wait, bounded by `ready_timeout`, for the
//! connection to become ready. If the connection fails first the request
//! is dropped with an error rather than queued indefinitely.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cardtable_protocol::{
    CardId, DrawCard, Fold, GameId, JoinGame, PlayCard, PlayerId, Request,
    RequestId, Response, StartGame,
};
use cardtable_transport::{
    Connection, DEFAULT_MAX_FRAME_LEN, TcpConnection,
};
use tokio::sync::{mpsc, watch};

use crate::ClientError;

/// Client-side configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long an outgoing request waits for the connection to become
    /// ready before being dropped.
    pub ready_timeout: Duration,
    /// Per-frame payload cap.
    pub max_frame_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(5),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Everything the application hears from the network, on one channel:
/// decoded messages, connection status changes, and protocol problems.
#[derive(Debug)]
pub enum ClientEvent {
    /// A decoded server message.
    Message(Response),
    /// The connection is established and ready for requests.
    Connected,
    /// Connecting failed (resolution or TCP). Terminal.
    ConnectFailed(String),
    /// The connection ended, cleanly or not. Terminal.
    Disconnected(String),
    /// One incoming payload could not be decoded; the connection
    /// continues with the next frame.
    ProtocolError(String),
}

/// Connection readiness, observed by senders through a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Connecting,
    Ready,
    Failed(String),
}

struct Shared {
    status: watch::Sender<Status>,
    conn: tokio::sync::OnceCell<Arc<TcpConnection>>,
    ready_timeout: Duration,
}

/// Handle for sending requests to the server.
pub struct Client {
    shared: Arc<Shared>,
    next_req_id: AtomicU64,
}

impl Client {
    /// Starts connecting to the server.
    ///
    /// Returns the sending handle plus the event channel receiver. The
    /// connection attempt itself runs in the background; its outcome
    /// arrives as [`ClientEvent::Connected`] or
    /// [`ClientEvent::ConnectFailed`].
    pub fn connect(
        addr: &str,
        config: ClientConfig,
    ) -> (Client, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(Status::Connecting);
        let shared = Arc::new(Shared {
            status: status_tx,
            conn: tokio::sync::OnceCell::new(),
            ready_timeout: config.ready_timeout,
        });

        let addr = addr.to_string();
        let task_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            match TcpConnection::connect_with_max_frame_len(
                &addr,
                config.max_frame_len,
            )
            .await
            {
                Ok(conn) => {
                    let conn = Arc::new(conn);
                    let _ = task_shared.conn.set(Arc::clone(&conn));
                    // `send_replace`: the status must update even while
                    // nobody is waiting on it yet.
                    task_shared.status.send_replace(Status::Ready);
                    let _ = events_tx.send(ClientEvent::Connected);
                    read_loop(conn, events_tx).await;
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "connect failed");
                    task_shared
                        .status
                        .send_replace(Status::Failed(e.to_string()));
                    let _ =
                        events_tx.send(ClientEvent::ConnectFailed(e.to_string()));
                }
            }
        });

        (
            Client {
                shared,
                next_req_id: AtomicU64::new(1),
            },
            events_rx,
        )
    }

    /// Mints the next per-connection request id.
    pub fn next_req_id(&self) -> RequestId {
        RequestId(self.next_req_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Sends a request, waiting (bounded) for connection readiness.
    pub async fn send(&self, request: &Request) -> Result<(), ClientError> {
        self.await_ready().await?;
        let conn = self
            .shared
            .conn
            .get()
            .ok_or_else(|| {
                ClientError::ConnectionFailed("connection not established".into())
            })?;
        conn.send(&request.encode()?).await?;
        Ok(())
    }

    /// Builds and sends a `join_game`, returning its request id.
    pub async fn join_game(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<RequestId, ClientError> {
        let req_id = self.next_req_id();
        self.send(&Request::JoinGame(JoinGame {
            req_id,
            player_id,
            game_id,
        }))
        .await?;
        Ok(req_id)
    }

    /// Builds and sends a `start_game`, returning its request id.
    pub async fn start_game(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<RequestId, ClientError> {
        let req_id = self.next_req_id();
        self.send(&Request::StartGame(StartGame {
            req_id,
            player_id,
            game_id,
        }))
        .await?;
        Ok(req_id)
    }

    /// Builds and sends a `play_card`, returning its request id.
    pub async fn play_card(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        card_id: CardId,
    ) -> Result<RequestId, ClientError> {
        let req_id = self.next_req_id();
        self.send(&Request::PlayCard(PlayCard {
            req_id,
            player_id,
            game_id,
            card_id,
        }))
        .await?;
        Ok(req_id)
    }

    /// Builds and sends a `draw_card`, returning its request id.
    pub async fn draw_card(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        nof_cards: u32,
    ) -> Result<RequestId, ClientError> {
        let req_id = self.next_req_id();
        self.send(&Request::DrawCard(DrawCard {
            req_id,
            player_id,
            game_id,
            nof_cards,
        }))
        .await?;
        Ok(req_id)
    }

    /// Builds and sends a `fold`, returning its request id.
    pub async fn fold(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<RequestId, ClientError> {
        let req_id = self.next_req_id();
        self.send(&Request::Fold(Fold {
            req_id,
            player_id,
            game_id,
        }))
        .await?;
        Ok(req_id)
    }

    /// Closes the connection, unblocking the reader.
    pub async fn close(&self) -> Result<(), ClientError> {
        if let Some(conn) = self.shared.conn.get() {
            conn.close().await?;
        }
        Ok(())
    }

    /// Waits for the connection to become ready, bounded by the
    /// configured timeout. A connection that fails first drops the
    /// request with an error.
    async fn await_ready(&self) -> Result<(), ClientError> {
        let mut status = self.shared.status.subscribe();
        let wait = async {
            loop {
                let current = status.borrow_and_update().clone();
                match current {
                    Status::Ready => return Ok(()),
                    Status::Failed(reason) => {
                        return Err(ClientError::ConnectionFailed(reason));
                    }
                    Status::Connecting => {}
                }
                if status.changed().await.is_err() {
                    return Err(ClientError::ConnectionFailed(
                        "client shut down".into(),
                    ));
                }
            }
        };
        tokio::time::timeout(self.shared.ready_timeout, wait)
            .await
            .map_err(|_| ClientError::NotReady(self.shared.ready_timeout))?
    }
}

/// The dedicated reader: decodes frames and hands messages off to the
/// application through the event channel. Runs until the connection
/// ends or the application drops the receiver.
async fn read_loop(
    conn: Arc<TcpConnection>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    loop {
        match conn.recv().await {
            Ok(Some(payload)) => match Response::decode(&payload) {
                Ok(response) => {
                    if events.send(ClientEvent::Message(response)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable server message");
                    if events
                        .send(ClientEvent::ProtocolError(e.to_string()))
                        .is_err()
                    {
                        break;
                    }
                }
            },
            Ok(None) => {
                let _ = events.send(ClientEvent::Disconnected(
                    "server closed the connection".into(),
                ));
                break;
            }
            Err(e) => {
                let _ = events.send(ClientEvent::Disconnected(e.to_string()));
                break;
            }
        }
    }
}
