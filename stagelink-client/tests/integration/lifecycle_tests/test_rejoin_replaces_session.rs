use stagelink_core::{ParticipantId, Role, RoomId};

use crate::integration::{
    create_test_session, init_tracing, offer_from, sync_with_dispatcher,
};

#[tokio::test]
async fn test_rejoin_replaces_session() {
    init_tracing();

    let (session, harness) = create_test_session();
    session
        .join_as_participant("room-1", None)
        .await
        .expect("First join failed");

    harness.transport.push(offer_from("h1", "host-offer")).await;
    assert_eq!(harness.transport.wait_for_sent("answer", 1, 2000).await.len(), 1);
    let first_epoch = session.snapshot().unwrap().epoch;
    let old_link = harness.peers.latest(&ParticipantId::from("h1")).unwrap();

    // Joining again without cleaning up first
    session
        .join_as_host("room-2", None)
        .await
        .expect("Second join failed");

    assert!(old_link.is_closed());
    let snapshot = session.snapshot().unwrap();
    assert!(snapshot.epoch > first_epoch);
    assert_eq!(snapshot.room, RoomId::from("room-2"));
    assert_eq!(snapshot.local.role, Role::Host);
    assert!(snapshot.peers.is_empty());
    assert!(snapshot.capture_active);

    let urls = harness.transport.urls().await;
    assert_eq!(urls.len(), 2);
    assert!(urls[1].contains("/ws/webrtc/room-2/"));

    // The replaced session never reports itself as ended
    assert!(sync_with_dispatcher(&session, &harness).await);
    assert_eq!(harness.observer.count_stream_ended().await, 0);

    session.cleanup();
}
