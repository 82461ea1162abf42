//! End-to-end tests: real WebSocket clients against a running server.
//!
//! Frames are built and checked as raw JSON so these tests pin the wire
//! format browsers depend on.

use std::time::Duration;

use chitchat::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn spawn_server(builder: ChitchatServerBuilder) -> (String, RouterHandle) {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let router = server.router();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, router)
}

/// Starts a server on a random port with a small denylist.
async fn start_server() -> (String, RouterHandle) {
    spawn_server(
        ChitchatServer::builder().filter(Denylist::new(["darn"])),
    )
    .await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, ack: u64, event: Value) {
    let frame = json!({ "ack": ack, "event": event });
    ws.send(Message::text(frame.to_string()))
        .await
        .expect("send frame");
}

/// Receives the next JSON frame, failing the test after two seconds.
async fn recv(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("recv error");
        match msg {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("valid JSON");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Collects frames up to and including the ack for `id`.
async fn until_ack(ws: &mut ClientWs, id: u64) -> (Vec<Value>, Value) {
    let mut events = Vec::new();
    loop {
        let frame = recv(ws).await;
        if frame["type"] == "ack" && frame["data"]["id"] == id {
            return (events, frame["data"].clone());
        }
        events.push(frame);
    }
}

async fn join(ws: &mut ClientWs, ack: u64, username: &str, room: &str) -> Value {
    send(
        ws,
        ack,
        json!({ "type": "join", "data": { "username": username, "room": room } }),
    )
    .await;
    until_ack(ws, ack).await.1
}

// =========================================================================
// join
// =========================================================================

#[tokio::test]
async fn test_join_success_sends_welcome_roster_then_ack() {
    let (addr, _router) = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        1,
        json!({ "type": "join", "data": { "username": " Bob ", "room": "Lobby" } }),
    )
    .await;
    let (events, ack) = until_ack(&mut ws, 1).await;

    assert_eq!(ack, json!({ "id": 1 }));
    assert_eq!(events.len(), 2, "got {events:?}");
    assert_eq!(events[0]["type"], "message");
    assert_eq!(events[0]["data"]["text"], "Welcome!");
    assert!(events[0]["data"].get("username").is_none());
    assert!(events[0]["data"]["createdAt"].as_u64().unwrap() > 0);
    assert_eq!(
        events[1],
        json!({ "type": "roomData", "data": { "room": "lobby", "users": ["Bob"] } })
    );
}

#[tokio::test]
async fn test_join_taken_name_acks_error() {
    let (addr, _router) = start_server().await;
    let mut alice = connect(&addr).await;
    let mut other = connect(&addr).await;
    join(&mut alice, 1, "Alice", "general").await;

    let ack = join(&mut other, 1, "alice", "general").await;

    assert_eq!(ack["error"]["code"], "UsernameTaken");
    assert!(ack["error"]["message"].as_str().unwrap().contains("alice"));
}

#[tokio::test]
async fn test_join_missing_room_acks_error() {
    let (addr, _router) = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, 4, json!({ "type": "join", "data": { "username": "Bob" } })).await;
    let (events, ack) = until_ack(&mut ws, 4).await;

    assert!(events.is_empty());
    assert_eq!(ack["error"]["code"], "MissingFields");
    assert_eq!(ack["error"]["message"], "Username and room are required");
}

// =========================================================================
// sendMessage / sendLocation
// =========================================================================

#[tokio::test]
async fn test_send_message_reaches_room_before_ack() {
    let (addr, _router) = start_server().await;
    let mut bob = connect(&addr).await;
    let mut carol = connect(&addr).await;
    join(&mut bob, 1, "Bob", "r1").await;
    join(&mut carol, 1, "Carol", "r1").await;
    // Bob hears about Carol.
    recv(&mut bob).await;
    recv(&mut bob).await;

    send(&mut bob, 2, json!({ "type": "sendMessage", "data": "hi all" })).await;
    let (events, ack) = until_ack(&mut bob, 2).await;

    assert_eq!(ack, json!({ "id": 2 }));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["data"]["username"], "Bob");
    assert_eq!(events[0]["data"]["text"], "hi all");

    let to_carol = recv(&mut carol).await;
    assert_eq!(to_carol["type"], "message");
    assert_eq!(to_carol["data"]["text"], "hi all");
}

#[tokio::test]
async fn test_send_message_profanity_acks_error() {
    let (addr, _router) = start_server().await;
    let mut bob = connect(&addr).await;
    join(&mut bob, 1, "Bob", "r1").await;

    send(&mut bob, 2, json!({ "type": "sendMessage", "data": "Darn it" })).await;
    let (events, ack) = until_ack(&mut bob, 2).await;

    assert!(events.is_empty(), "nothing broadcast, got {events:?}");
    assert_eq!(ack["error"]["code"], "Profanity");
    assert_eq!(ack["error"]["message"], "Profanity is not allowed");
}

#[tokio::test]
async fn test_send_message_before_join_acks_not_joined() {
    let (addr, _router) = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, 9, json!({ "type": "sendMessage", "data": "hello?" })).await;
    let (_, ack) = until_ack(&mut ws, 9).await;

    assert_eq!(ack["error"]["code"], "NotJoined");
}

#[tokio::test]
async fn test_send_location_shares_map_url() {
    let (addr, _router) = start_server().await;
    let mut bob = connect(&addr).await;
    let mut carol = connect(&addr).await;
    join(&mut bob, 1, "Bob", "r1").await;
    join(&mut carol, 1, "Carol", "r1").await;
    recv(&mut bob).await;
    recv(&mut bob).await;

    send(
        &mut bob,
        2,
        json!({ "type": "sendLocation", "data": { "lat": 45, "lng": -75 } }),
    )
    .await;
    let (events, _) = until_ack(&mut bob, 2).await;
    let to_carol = recv(&mut carol).await;

    for frame in [&events[0], &to_carol] {
        assert_eq!(frame["type"], "locationMessage");
        assert_eq!(frame["data"]["username"], "Bob");
        assert_eq!(
            frame["data"]["url"],
            "https://www.google.com/maps?q=45,-75"
        );
    }
}

// =========================================================================
// disconnect
// =========================================================================

#[tokio::test]
async fn test_disconnect_notifies_room() {
    let (addr, router) = start_server().await;
    let mut bob = connect(&addr).await;
    let mut carol = connect(&addr).await;
    join(&mut bob, 1, "Bob", "r1").await;
    join(&mut carol, 1, "Carol", "r1").await;

    bob.close(None).await.expect("close");

    let left = recv(&mut carol).await;
    assert_eq!(left["data"]["text"], "Bob has left.");
    let roster = recv(&mut carol).await;
    assert_eq!(
        roster,
        json!({ "type": "roomData", "data": { "room": "r1", "users": ["Carol"] } })
    );
    assert_eq!(router.roster("r1").await.unwrap(), vec!["Carol"]);
}

#[tokio::test]
async fn test_dropped_socket_frees_username() {
    let (addr, _router) = start_server().await;
    let mut first = connect(&addr).await;
    join(&mut first, 1, "Bob", "r1").await;
    drop(first);

    let mut second = connect(&addr).await;
    let mut ack = Value::Null;
    for attempt in 0..50 {
        ack = join(&mut second, attempt, "Bob", "r1").await;
        if ack.get("error").is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(ack.get("error").is_none(), "name never freed: {ack}");
}

// =========================================================================
// framing
// =========================================================================

#[tokio::test]
async fn test_malformed_frame_skipped_connection_stays_open() {
    let (addr, _router) = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("this is not json")).await.expect("send");
    send(&mut ws, 1, json!({ "type": "teleport", "data": {} })).await;
    let ack = join(&mut ws, 2, "Bob", "r1").await;

    assert_eq!(ack, json!({ "id": 2 }));
}

#[tokio::test]
async fn test_bad_event_with_readable_ack_acks_invalid_frame() {
    let (addr, _router) = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        5,
        json!({ "type": "sendLocation", "data": { "lat": "45", "lng": -75 } }),
    )
    .await;
    let (events, ack) = until_ack(&mut ws, 5).await;

    assert!(events.is_empty(), "got {events:?}");
    assert_eq!(ack["error"]["code"], "InvalidFrame");
    assert!(ack["error"]["message"].as_str().is_some());
}

#[tokio::test]
async fn test_router_gone_acks_unavailable_then_closes() {
    let server = ChitchatServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    server.router().shutdown().await.expect("router stops");
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    let mut ws = connect(&addr).await;

    let ack = join(&mut ws, 1, "Bob", "r1").await;
    assert_eq!(ack["error"]["code"], "Unavailable");

    let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("server should close the socket");
    assert!(
        matches!(next, None | Some(Err(_)) | Some(Ok(Message::Close(_)))),
        "expected close, got {next:?}"
    );
}

#[tokio::test]
async fn test_binary_frames_accepted() {
    let (addr, _router) = start_server().await;
    let mut ws = connect(&addr).await;

    let frame = json!({
        "ack": 1,
        "event": { "type": "join", "data": { "username": "Bob", "room": "r1" } }
    });
    ws.send(Message::binary(serde_json::to_vec(&frame).unwrap()))
        .await
        .expect("send");
    let (_, ack) = until_ack(&mut ws, 1).await;

    assert_eq!(ack, json!({ "id": 1 }));
}

// =========================================================================
// configuration
// =========================================================================

#[tokio::test]
async fn test_denylist_file_loaded_from_config() {
    let path = std::env::temp_dir()
        .join(format!("chitchat-denylist-{}.txt", std::process::id()));
    std::fs::write(&path, "# test list\nfrick\n").unwrap();

    let config = ServerConfig {
        denylist_path: Some(path.clone()),
        ..ServerConfig::default()
    };
    let (addr, _router) =
        spawn_server(ChitchatServer::builder().config(config)).await;
    let mut bob = connect(&addr).await;
    join(&mut bob, 1, "Bob", "r1").await;

    send(&mut bob, 2, json!({ "type": "sendMessage", "data": "frick" })).await;
    let (_, ack) = until_ack(&mut bob, 2).await;
    std::fs::remove_file(&path).ok();

    assert_eq!(ack["error"]["code"], "Profanity");
}

#[tokio::test]
async fn test_build_missing_denylist_file_returns_config_error() {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".into(),
        denylist_path: Some("/definitely/not/here.txt".into()),
        ..ServerConfig::default()
    };

    let result = ChitchatServer::builder().config(config).build().await;

    assert!(matches!(result, Err(ChitchatError::Config(_))));
}

#[tokio::test]
async fn test_custom_welcome_text() {
    let (addr, _router) = spawn_server(ChitchatServer::builder().router_config(
        RouterConfig {
            welcome_text: "Hello, friend".into(),
            ..RouterConfig::default()
        },
    ))
    .await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        1,
        json!({ "type": "join", "data": { "username": "Bob", "room": "r1" } }),
    )
    .await;
    let (events, _) = until_ack(&mut ws, 1).await;

    assert_eq!(events[0]["data"]["text"], "Hello, friend");
}

#[tokio::test]
async fn test_run_until_shutdown_stops_router() {
    let server = ChitchatServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    let router = server.router();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let task = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));
    stop_tx.send(()).unwrap();
    task.await.unwrap().unwrap();

    assert!(matches!(
        router.roster("r1").await,
        Err(ChatError::Unavailable)
    ));
}
