use stagelink_client::peer::SignalingState;
use stagelink_core::{ParticipantId, SdpKind};

use crate::integration::{answer_from, create_test_session, init_tracing, user_joined, wait_until};

#[tokio::test]
async fn test_host_ends_stream() {
    init_tracing();

    let (session, harness) = create_test_session();
    session
        .join_as_host("room-1", None)
        .await
        .expect("Host join failed");

    harness.transport.push(user_joined("v1")).await;
    harness.transport.push(user_joined("v2")).await;
    let offers = harness.transport.wait_for_sent("offer", 2, 2000).await;
    assert_eq!(offers.len(), 2);

    let v1 = ParticipantId::from("v1");
    let c1 = harness.peers.latest(&v1).unwrap();
    harness.transport.push(answer_from("v1", "viewer-answer")).await;
    assert!(wait_until(|| c1.remote_descriptions(SdpKind::Answer) == 1, 2000).await);
    assert_eq!(
        session.snapshot().unwrap().peer(&v1).unwrap().signaling,
        SignalingState::Stable
    );

    session.end_stream().await.expect("Ending the stream failed");

    // The announcement went out before the channel closed
    let ended = harness.transport.sent_of_type("stream_ended").await;
    assert_eq!(ended.len(), 1);
    assert!(harness.transport.client_closed().await);

    assert!(!session.is_active());
    assert!(session.snapshot().is_none());
    for id in ["v1", "v2"] {
        let connection = harness.peers.latest(&ParticipantId::from(id)).unwrap();
        assert!(connection.is_closed(), "Link to {id} left open");
    }
    assert!(harness.devices.tracks().iter().all(|t| !t.is_live()));
    assert!(harness.transport.wait_for_reader_gone(2000).await);

    // Ending locally does not report an ended stream to ourselves
    assert_eq!(harness.observer.count_stream_ended().await, 0);

    // A second end is a no-op
    session.end_stream().await.expect("Second end should be a no-op");
    assert_eq!(harness.transport.sent_of_type("stream_ended").await.len(), 1);
}

#[tokio::test]
async fn test_viewer_end_stream_sends_nothing() {
    init_tracing();

    let (session, harness) = create_test_session();
    session
        .join_as_participant("room-1", None)
        .await
        .expect("Participant join failed");

    session.end_stream().await.expect("Ending failed");

    assert!(harness.transport.sent_of_type("stream_ended").await.is_empty());
    assert!(!session.is_active());
}
