//! Integration tests: the client connector and replica against a real
//! server, driven the way an application would drive them.

use std::time::Duration;

use cardtable::prelude::*;
use cardtable_client::{
    Applied, Client, ClientConfig, ClientEvent, ClientGame,
};
use tokio::sync::mpsc;

async fn start_server(mode: SyncMode) -> String {
    let server = CardtableServer::builder()
        .bind("127.0.0.1:0")
        .sync_mode(mode)
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("local addr").to_string();
    tokio::spawn(server.run());
    addr
}

/// Drains events until the next decoded message, applying it to the
/// replica; panics on terminal events.
async fn next_applied(
    events: &mut mpsc::UnboundedReceiver<ClientEvent>,
    replica: &mut ClientGame,
) -> Applied {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("no event within 5s")
            .expect("event channel closed");
        match event {
            ClientEvent::Message(response) => {
                return replica.apply(&response).expect("apply");
            }
            ClientEvent::Connected => continue,
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_full_game_flow_through_the_client() {
    let addr = start_server(SyncMode::FullState).await;
    let game = GameId::new("G1");

    let (p1, mut p1_events) = Client::connect(&addr, ClientConfig::default());
    let (p2, mut p2_events) = Client::connect(&addr, ClientConfig::default());
    let mut p1_view = ClientGame::new(game.clone());
    let mut p2_view = ClientGame::new(game.clone());

    // Join both players. Each join answers the joiner and broadcasts to
    // the players already seated.
    p1.join_game(game.clone(), PlayerId::new("P1")).await.unwrap();
    assert_eq!(next_applied(&mut p1_events, &mut p1_view).await, Applied::Updated);

    p2.join_game(game.clone(), PlayerId::new("P2")).await.unwrap();
    assert_eq!(next_applied(&mut p2_events, &mut p2_view).await, Applied::Updated);
    assert_eq!(next_applied(&mut p1_events, &mut p1_view).await, Applied::Updated);

    // Start, then P1 draws two cards.
    p1.start_game(game.clone(), PlayerId::new("P1")).await.unwrap();
    next_applied(&mut p1_events, &mut p1_view).await;
    next_applied(&mut p2_events, &mut p2_view).await;

    let before = p1_view.hand(&PlayerId::new("P1")).unwrap().len();
    p1.draw_card(game.clone(), PlayerId::new("P1"), 2).await.unwrap();
    next_applied(&mut p1_events, &mut p1_view).await;
    next_applied(&mut p2_events, &mut p2_view).await;

    assert_eq!(
        p1_view.hand(&PlayerId::new("P1")).unwrap().len(),
        before + 2,
        "P1's local hand view must grow by exactly 2 cards"
    );
    assert_eq!(
        p1_view.state().unwrap(),
        p2_view.state().unwrap(),
        "both replicas see the same state"
    );
}

#[tokio::test]
async fn test_rejection_leaves_local_state_unchanged() {
    let addr = start_server(SyncMode::Diff).await;
    let game = GameId::new("G1");

    let (p1, mut p1_events) = Client::connect(&addr, ClientConfig::default());
    let (p2, mut p2_events) = Client::connect(&addr, ClientConfig::default());
    let mut p1_view = ClientGame::new(game.clone());
    let mut p2_view = ClientGame::new(game.clone());

    p1.join_game(game.clone(), PlayerId::new("P1")).await.unwrap();
    next_applied(&mut p1_events, &mut p1_view).await;
    p2.join_game(game.clone(), PlayerId::new("P2")).await.unwrap();
    next_applied(&mut p2_events, &mut p2_view).await;
    next_applied(&mut p1_events, &mut p1_view).await;
    p1.start_game(game.clone(), PlayerId::new("P1")).await.unwrap();
    next_applied(&mut p1_events, &mut p1_view).await;
    next_applied(&mut p2_events, &mut p2_view).await;

    let before = p1_view.state().unwrap().clone();

    // A card P1 cannot be holding (it is in P2's hand or the piles).
    let foreign = p2_view.hand(&PlayerId::new("P2")).unwrap()[0].id.clone();
    p1.play_card(game.clone(), PlayerId::new("P1"), foreign)
        .await
        .unwrap();
    let applied = next_applied(&mut p1_events, &mut p1_view).await;
    assert_eq!(applied, Applied::Rejected("card not in hand".into()));
    assert_eq!(
        p1_view.state().unwrap(),
        &before,
        "a rejection must not move the replica"
    );
}

#[tokio::test]
async fn test_connect_failure_reported_on_event_channel() {
    // Nothing listens on this port (bound but not accepting is racy;
    // an unresolvable name is deterministic).
    let (client, mut events) = Client::connect(
        "definitely-not-a-real-host.invalid:9",
        ClientConfig {
            ready_timeout: Duration::from_millis(200),
            ..ClientConfig::default()
        },
    );

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event within 5s")
        .expect("event");
    assert!(matches!(event, ClientEvent::ConnectFailed(_)));

    // A request against the failed connection is dropped with an error,
    // not queued.
    let err = client
        .join_game(GameId::new("G1"), PlayerId::new("P1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        cardtable_client::ClientError::ConnectionFailed(_)
            | cardtable_client::ClientError::NotReady(_)
    ));
}

#[tokio::test]
async fn test_disconnect_surfaces_as_terminal_event() {
    let addr = start_server(SyncMode::FullState).await;
    let (client, mut events) = Client::connect(&addr, ClientConfig::default());

    // Wait until connected, then close from our side.
    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event within 5s")
            .expect("event")
        {
            ClientEvent::Connected => break,
            other => panic!("unexpected event: {other:?}"),
        }
    }
    client.close().await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event within 5s")
        .expect("event");
    assert!(matches!(event, ClientEvent::Disconnected(_)));
}
