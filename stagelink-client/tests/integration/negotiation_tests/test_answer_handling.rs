use stagelink_client::peer::SignalingState;
use stagelink_core::{ParticipantId, SdpKind};

use crate::integration::{
    answer_from, create_test_session, init_tracing, sync_with_dispatcher, user_joined,
};

#[tokio::test]
async fn test_duplicate_answer_is_applied_once() {
    init_tracing();

    let (session, harness) = create_test_session();
    session
        .join_as_host("room-1", None)
        .await
        .expect("Host join failed");

    harness.transport.push(user_joined("v1")).await;
    assert_eq!(harness.transport.wait_for_sent("offer", 1, 2000).await.len(), 1);

    // The server relays the same answer twice
    harness.transport.push(answer_from("v1", "viewer-answer")).await;
    harness.transport.push(answer_from("v1", "viewer-answer")).await;
    assert!(sync_with_dispatcher(&session, &harness).await);

    let viewer = ParticipantId::from("v1");
    let connection = harness.peers.latest(&viewer).unwrap();
    assert_eq!(connection.remote_descriptions(SdpKind::Answer), 1);
    assert!(!connection.is_closed());

    let link = session.snapshot().unwrap().peer(&viewer).cloned().unwrap();
    assert_eq!(link.signaling, SignalingState::Stable);
    assert!(link.has_remote_description);

    session.cleanup();
}

#[tokio::test]
async fn test_answer_without_link_is_ignored() {
    init_tracing();

    let (session, harness) = create_test_session();
    session
        .join_as_host("room-1", None)
        .await
        .expect("Host join failed");

    harness.transport.push(answer_from("ghost", "stray-answer")).await;
    assert!(sync_with_dispatcher(&session, &harness).await);

    assert!(harness.peers.connections().is_empty());
    assert!(session.snapshot().unwrap().peers.is_empty());
    assert!(session.is_active());
}

#[tokio::test]
async fn test_rejected_answer_drops_the_link() {
    init_tracing();

    let (session, harness) = create_test_session();
    session
        .join_as_host("room-1", None)
        .await
        .expect("Host join failed");

    harness.peers.reject_answers();
    harness.transport.push(user_joined("v1")).await;
    harness.transport.push(user_joined("v2")).await;
    assert_eq!(harness.transport.wait_for_sent("offer", 2, 2000).await.len(), 2);

    harness.transport.push(answer_from("v1", "late-answer")).await;
    assert!(sync_with_dispatcher(&session, &harness).await);

    let v1 = ParticipantId::from("v1");
    let v2 = ParticipantId::from("v2");
    let snapshot = session.snapshot().unwrap();
    assert!(snapshot.peer(&v1).is_none(), "Link to v1 should be dropped");
    assert!(harness.peers.latest(&v1).unwrap().is_closed());
    assert!(snapshot.peer(&v2).is_some());
    assert!(!harness.peers.latest(&v2).unwrap().is_closed());

    session.cleanup();
}
