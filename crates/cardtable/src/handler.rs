//! Per-connection handler: frame decode, dispatch, and broadcasts.
//!
//! Each accepted connection gets its own task running this handler. The
//! flow per frame: decode the request via the registry, execute it
//! against the coordinator, answer the initiator, and fan the committed
//! state change out to the other players in the game.
//!
//! Writes go through a per-connection writer task fed by a channel, so a
//! broadcast arriving from another connection's handler can never
//! interleave bytes with a response in flight.

use std::collections::HashMap;
use std::sync::Arc;

use cardtable_protocol::{GameId, PlayerId, Request, Response};
use cardtable_transport::{Connection, TcpConnection, TransportError};
use tokio::sync::{Mutex, mpsc};

use crate::CardtableError;
use crate::server::ServerState;

/// Outbound channel into one connection's writer task.
type OutboundSender = mpsc::UnboundedSender<Response>;

/// Routes state broadcasts to the players seated at each game.
///
/// A connection registers its outbound channel under a player id when
/// that player's join succeeds, and unregisters on disconnect. Senders
/// whose receiver is gone are dropped on the next broadcast, the same
/// way a dead player is skipped rather than crashed on.
pub(crate) struct Broadcaster {
    games: Mutex<HashMap<GameId, HashMap<PlayerId, OutboundSender>>>,
}

impl Broadcaster {
    pub(crate) fn new() -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
        }
    }

    async fn register(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        sender: OutboundSender,
    ) {
        self.games
            .lock()
            .await
            .entry(game_id.clone())
            .or_default()
            .insert(player_id.clone(), sender);
    }

    async fn unregister(&self, game_id: &GameId, player_id: &PlayerId) {
        let mut games = self.games.lock().await;
        if let Some(players) = games.get_mut(game_id) {
            players.remove(player_id);
            if players.is_empty() {
                games.remove(game_id);
            }
        }
    }

    /// Sends `response` to every player in the game except `initiator`.
    async fn send_to_others(
        &self,
        game_id: &GameId,
        initiator: &PlayerId,
        response: &Response,
    ) {
        let mut games = self.games.lock().await;
        let Some(players) = games.get_mut(game_id) else {
            return;
        };
        players.retain(|player_id, sender| {
            if player_id == initiator {
                return true;
            }
            // A closed receiver means the connection died; drop the seat.
            sender.send(response.clone()).is_ok()
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: TcpConnection,
    state: Arc<ServerState>,
) -> Result<(), CardtableError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Response>();

    // Writer task: everything this connection sends funnels through one
    // channel, keeping frames whole and in order.
    let writer_conn = Arc::clone(&conn);
    let writer = tokio::spawn(async move {
        while let Some(response) = outbound_rx.recv().await {
            let payload = match response.encode() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode response");
                    continue;
                }
            };
            if let Err(e) = writer_conn.send(&payload).await {
                tracing::debug!(error = %e, "write failed, stopping writer");
                break;
            }
        }
    });

    let mut joined: Vec<(GameId, PlayerId)> = Vec::new();
    let result = read_loop(&conn, &state, &outbound_tx, &mut joined).await;

    // Cleanup runs on every exit path: clean close, truncation, IO error.
    for (game_id, player_id) in &joined {
        state.broadcaster.unregister(game_id, player_id).await;
    }
    drop(outbound_tx);
    let _ = writer.await;
    tracing::debug!(%conn_id, "connection closed");
    result
}

async fn read_loop(
    conn: &Arc<TcpConnection>,
    state: &Arc<ServerState>,
    outbound_tx: &OutboundSender,
    joined: &mut Vec<(GameId, PlayerId)>,
) -> Result<(), CardtableError> {
    loop {
        let payload = match conn.recv().await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::debug!(id = %conn.id(), "peer closed cleanly");
                return Ok(());
            }
            // Truncation and transport failures are terminal for the
            // connection; the partial frame is discarded with it.
            Err(e @ TransportError::TruncatedFrame { .. }) => {
                tracing::debug!(id = %conn.id(), error = %e, "stream truncated");
                return Err(e.into());
            }
            Err(e) => {
                tracing::debug!(id = %conn.id(), error = %e, "recv failed");
                return Err(e.into());
            }
        };

        // Payload-level problems (unknown discriminant, missing fields)
        // are reported and the connection keeps serving later frames.
        let request = match Request::decode(&payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(id = %conn.id(), error = %e, "undecodable request");
                continue;
            }
        };

        let response = request.execute(&state.coordinator).await;

        // A join that succeeded seats this connection at the table; from
        // now on it hears the game's broadcasts.
        if let (Request::JoinGame(join), Response::RequestResponse(r)) =
            (&request, &response)
        {
            if r.success {
                state
                    .broadcaster
                    .register(
                        &join.game_id,
                        &join.player_id,
                        outbound_tx.clone(),
                    )
                    .await;
                joined.push((join.game_id.clone(), join.player_id.clone()));
            }
        }

        // Fan the committed change out to the rest of the table before
        // queueing the initiator's answer.
        if let Response::RequestResponse(r) = &response {
            if let (true, Some(payload)) = (r.success, &r.state) {
                let broadcast =
                    Response::broadcast(r.game_id.clone(), payload.clone());
                state
                    .broadcaster
                    .send_to_others(
                        &r.game_id,
                        request.player_id(),
                        &broadcast,
                    )
                    .await;
            }
        }

        if outbound_tx.send(response).is_err() {
            // Writer died mid-conversation; treat it as a lost connection.
            return Err(TransportError::ConnectionClosed(
                "writer task stopped".into(),
            )
            .into());
        }
    }
}
