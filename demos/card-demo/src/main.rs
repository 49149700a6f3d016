//! A scripted two-player game against an in-process server.
//!
//! Starts a diff-mode server on a loopback port, connects two clients,
//! and plays a short exchange: join, start, draw, play, fold. Each
//! client keeps its own replica current purely from received messages,
//! and prints what it sees.

use cardtable::prelude::*;
use cardtable_client::{Applied, Client, ClientConfig, ClientEvent, ClientGame};
use tokio::sync::mpsc;

struct Seat {
    name: &'static str,
    player_id: PlayerId,
    client: Client,
    events: mpsc::UnboundedReceiver<ClientEvent>,
    view: ClientGame,
}

impl Seat {
    fn new(
        name: &'static str,
        addr: &str,
        game: &GameId,
    ) -> Seat {
        let (client, events) = Client::connect(addr, ClientConfig::default());
        Seat {
            name,
            player_id: PlayerId::new(name),
            client,
            events,
            view: ClientGame::new(game.clone()),
        }
    }

    /// Waits for the next server message and folds it into the replica.
    async fn sync(&mut self) {
        loop {
            match self.events.recv().await {
                Some(ClientEvent::Message(response)) => {
                    match self.view.apply(&response) {
                        Ok(Applied::Updated) => self.describe(),
                        Ok(Applied::Rejected(reason)) => {
                            println!("[{}] rejected: {reason}", self.name);
                        }
                        Ok(Applied::Ignored) => continue,
                        Err(e) => println!("[{}] apply failed: {e}", self.name),
                    }
                    return;
                }
                Some(ClientEvent::Connected) => continue,
                Some(other) => {
                    println!("[{}] {other:?}", self.name);
                    return;
                }
                None => return,
            }
        }
    }

    fn describe(&self) {
        let Some(state) = self.view.state() else {
            return;
        };
        let hands: Vec<String> = state
            .players
            .iter()
            .map(|p| format!("{}:{} cards", p.id, p.hand.len()))
            .collect();
        println!(
            "[{}] v{} {} | {} | pile {}",
            self.name,
            state.version,
            state.phase,
            hands.join(", "),
            state.draw_pile.len()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardtable=info".into()),
        )
        .init();

    let server = CardtableServer::builder()
        .bind("127.0.0.1:0")
        .sync_mode(SyncMode::Diff)
        .build()
        .await?;
    let addr = server.local_addr()?.to_string();
    tokio::spawn(server.run());
    println!("server listening on {addr}");

    let game = GameId::new("demo");
    let mut north = Seat::new("north", &addr, &game);
    let mut south = Seat::new("south", &addr, &game);

    // Everyone sits down. Each successful mutation answers the actor
    // and is broadcast to the rest of the table.
    north
        .client
        .join_game(game.clone(), north.player_id.clone())
        .await?;
    north.sync().await;

    south
        .client
        .join_game(game.clone(), south.player_id.clone())
        .await?;
    south.sync().await;
    north.sync().await;

    north
        .client
        .start_game(game.clone(), north.player_id.clone())
        .await?;
    north.sync().await;
    south.sync().await;

    // North draws two, then plays the first card it holds.
    north
        .client
        .draw_card(game.clone(), north.player_id.clone(), 2)
        .await?;
    north.sync().await;
    south.sync().await;

    let card = north.view.hand(&north.player_id).expect("hand")[0].id.clone();
    north
        .client
        .play_card(game.clone(), north.player_id.clone(), card)
        .await?;
    north.sync().await;
    south.sync().await;

    // South bows out, which hands north the win and ends the game.
    south
        .client
        .fold(game.clone(), south.player_id.clone())
        .await?;
    south.sync().await;
    north.sync().await;

    println!("game over");
    Ok(())
}
