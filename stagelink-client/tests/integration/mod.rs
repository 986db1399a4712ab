//! Integration tests for stagelink-client.
//!
//! Tests are organized by functionality:
//! - `host_tests` - broadcasting to viewers
//! - `negotiation_tests` - offer/answer and ICE exchange per peer
//! - `lifecycle_tests` - joining, ending and cleaning up sessions
//! - `transport_tests` - the WebSocket transport against a local relay

pub mod host_tests;

use serde_json::{Value, json};
use stagelink_client::Session;
use stagelink_client::signaling::StaticToken;
use tracing::Level;

use crate::utils::{MockMediaDevices, MockPeerFactory, MockTransport, RecordingObserver};

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Handles on everything a test session talks to.
pub struct TestHarness {
    pub transport: MockTransport,
    pub peers: MockPeerFactory,
    pub devices: MockMediaDevices,
    pub observer: RecordingObserver,
}

/// Create a session wired to in-memory collaborators.
pub fn create_test_session() -> (Session, TestHarness) {
    create_test_session_with(MockMediaDevices::new())
}

pub fn create_test_session_with(devices: MockMediaDevices) -> (Session, TestHarness) {
    let harness = TestHarness {
        transport: MockTransport::new(),
        peers: MockPeerFactory::new(),
        devices,
        observer: RecordingObserver::new(),
    };

    let session = Session::builder(StaticToken::new("test-token"))
        .transport(harness.transport.clone())
        .peer_factory(harness.peers.clone())
        .media_devices(harness.devices.clone())
        .observer(harness.observer.clone())
        .build();

    (session, harness)
}

/// Poll `check` every 10ms until it holds or `timeout_ms` passes.
pub async fn wait_until(mut check: impl FnMut() -> bool, timeout_ms: u64) -> bool {
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    loop {
        if check() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

/// Round-trips a `get_users` request; every frame pushed before it has
/// been handled once this returns true.
pub async fn sync_with_dispatcher(session: &Session, harness: &TestHarness) -> bool {
    let seen = harness.observer.count_user_lists().await;
    if session.request_user_list().is_err() {
        return false;
    }
    harness.transport.push(user_list()).await;

    let start = std::time::Instant::now();
    while start.elapsed() < std::time::Duration::from_millis(2000) {
        if harness.observer.count_user_lists().await > seen {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}

pub fn user_joined(id: &str) -> Value {
    json!({"type": "user_joined", "user_id": id, "user_name": format!("viewer {id}")})
}

pub fn user_left(id: &str) -> Value {
    json!({"type": "user_left", "user_id": id})
}

pub fn user_list() -> Value {
    json!({"type": "user_list", "users": []})
}

pub fn offer_from(id: &str, sdp: &str) -> Value {
    json!({
        "type": "offer",
        "offer": {"type": "offer", "sdp": sdp},
        "sender_id": id,
    })
}

pub fn answer_from(id: &str, sdp: &str) -> Value {
    json!({
        "type": "answer",
        "answer": {"type": "answer", "sdp": sdp},
        "sender_id": id,
    })
}

pub fn candidate_from(id: &str, candidate: &str) -> Value {
    json!({
        "type": "ice_candidate",
        "candidate": {"candidate": candidate, "sdpMid": "0", "sdpMLineIndex": 0},
        "sender_id": id,
    })
}
