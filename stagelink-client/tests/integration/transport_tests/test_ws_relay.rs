use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Value, json};
use stagelink_client::signaling::{SignalingTransport, StaticToken, WsTransport};
use stagelink_client::{ClientConfig, Session};
use stagelink_core::ParticipantId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::integration::init_tracing;
use crate::utils::{MockMediaDevices, MockPeerFactory, ObserverEvent, RecordingObserver};

/// Minimal stand-in for the signaling server: greets every socket with a
/// viewer joining, answers `get_users` and records what it receives.
/// A `kick` token gets the socket closed right after the greeting.
#[derive(Clone, Default)]
struct Relay {
    connections: Arc<Mutex<Vec<(String, String)>>>,
    received: Arc<Mutex<Vec<Value>>>,
    closed: Arc<AtomicBool>,
}

impl Relay {
    async fn start() -> (String, Relay) {
        let relay = Relay::default();
        let app = Router::new()
            .route("/ws/webrtc/{room}/", get(relay_handler))
            .with_state(relay.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), relay)
    }

    async fn wait_for(&self, kind: &str, timeout_ms: u64) -> Option<Value> {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            if let Some(frame) = self
                .received
                .lock()
                .await
                .iter()
                .find(|f| f["type"] == kind)
            {
                return Some(frame.clone());
            }
            if start.elapsed() > timeout {
                return None;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    async fn wait_closed(&self, timeout_ms: u64) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < std::time::Duration::from_millis(timeout_ms) {
            if self.closed.load(Ordering::SeqCst) {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }
}

async fn relay_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(relay): State<Relay>,
) -> impl IntoResponse {
    let token = params.get("token").cloned().unwrap_or_default();
    ws.on_upgrade(move |socket| handle_socket(socket, room, token, relay))
}

async fn handle_socket(mut socket: WebSocket, room: String, token: String, relay: Relay) {
    let kick = token == "kick";
    relay.connections.lock().await.push((room, token));

    let joined = json!({"type": "user_joined", "user_id": "v1", "user_name": "Viewer"});
    if socket
        .send(Message::Text(joined.to_string().into()))
        .await
        .is_err()
    {
        return;
    }
    if kick {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                if frame["type"] == "get_users" {
                    let reply = json!({
                        "type": "user_list",
                        "users": [{"user_id": 7, "user_name": "Viewer"}],
                    });
                    let _ = socket.send(Message::Text(reply.to_string().into())).await;
                }
                relay.received.lock().await.push(frame);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    relay.closed.store(true, Ordering::SeqCst);
}

fn config_for(base: &str) -> ClientConfig {
    ClientConfig {
        backend_url: format!("{base}/api/v1/"),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn test_host_session_over_websocket() {
    init_tracing();

    let (base, relay) = Relay::start().await;
    let peers = MockPeerFactory::new();
    let observer = RecordingObserver::new();
    let session = Session::builder(StaticToken::new("secret"))
        .config(config_for(&base))
        .peer_factory(peers.clone())
        .media_devices(MockMediaDevices::new())
        .observer(observer.clone())
        .build();

    session
        .join_as_host("stage", None)
        .await
        .expect("Host join failed");

    // The greeting makes the host offer to v1
    let offer = relay.wait_for("offer", 2000).await.expect("No offer relayed");
    assert_eq!(offer["target_user_id"], "v1");
    assert!(observer.has_join(&ParticipantId::from("v1")).await);
    assert_eq!(
        relay.connections.lock().await.clone(),
        vec![("stage".to_owned(), "secret".to_owned())]
    );

    // Numeric ids from the server come back as text
    session.request_user_list().expect("Request failed");
    assert!(observer.wait_for_user_list(2000).await);
    let users = observer
        .get_events()
        .await
        .into_iter()
        .find_map(|e| match e {
            ObserverEvent::UserList { users } => Some(users),
            _ => None,
        })
        .unwrap();
    assert_eq!(users[0].user_id, ParticipantId::from("7"));

    session.end_stream().await.expect("End failed");
    assert!(relay.wait_for("stream_ended", 2000).await.is_some());
    assert!(relay.wait_closed(2000).await, "Socket was not closed");
}

#[tokio::test]
async fn test_server_close_ends_session() {
    init_tracing();

    let (base, _relay) = Relay::start().await;
    let observer = RecordingObserver::new();
    let session = Session::builder(StaticToken::new("kick"))
        .config(config_for(&base))
        .peer_factory(MockPeerFactory::new())
        .observer(observer.clone())
        .build();

    session
        .join_as_participant("stage", None)
        .await
        .expect("Participant join failed");

    assert!(observer.wait_for_events(2, 2000).await);
    assert_eq!(observer.count_stream_ended().await, 1);
    assert!(!session.is_active());
}

#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    init_tracing();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = WsTransport
        .connect(&format!("ws://{addr}/ws/webrtc/stage/?token=t"))
        .await;
    assert!(result.is_err());
}
