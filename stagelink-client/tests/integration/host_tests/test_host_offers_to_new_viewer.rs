use stagelink_client::media::TrackKind;
use stagelink_client::peer::{OfferOptions, SignalingState};
use stagelink_core::{ParticipantId, Role, SdpKind};
use std::sync::Arc;

use crate::integration::{
    answer_from, candidate_from, create_test_session, init_tracing, user_joined, wait_until,
};
use crate::utils::{ConnectionCall, RecordingRenderTarget};

#[tokio::test]
async fn test_host_offers_to_new_viewer() {
    init_tracing();

    let (session, harness) = create_test_session();
    let preview = RecordingRenderTarget::new();

    session
        .join_as_host("room-1", Some(Arc::new(preview.clone())))
        .await
        .expect("Host join failed");

    let urls = harness.transport.urls().await;
    assert_eq!(urls.len(), 1);
    assert!(urls[0].contains("/ws/webrtc/room-1/"), "unexpected url {}", urls[0]);
    assert!(urls[0].ends_with("?token=test-token"));

    // Capture is running and previewed before the join returns
    let snapshot = session.snapshot().expect("Session should be active");
    assert_eq!(snapshot.local.role, Role::Host);
    assert!(snapshot.capture_active);
    assert!(snapshot.channel_open);
    assert!(preview.local_source().is_some());
    assert_eq!(preview.plays(), 1);

    // A viewer joins
    let viewer = ParticipantId::from("v1");
    harness.transport.push(user_joined("v1")).await;

    let offers = harness.transport.wait_for_sent("offer", 1, 2000).await;
    assert_eq!(offers.len(), 1, "Expected one offer");
    assert_eq!(offers[0]["target_user_id"], "v1");
    assert_eq!(offers[0]["offer"]["type"], "offer");
    assert_eq!(offers[0]["offer"]["sdp"], "offer-from-host-to-v1");
    assert!(harness.observer.has_join(&viewer).await);

    let connection = harness.peers.latest(&viewer).expect("No connection for v1");
    assert_eq!(
        connection.calls(),
        vec![
            ConnectionCall::AddTrack(TrackKind::Audio),
            ConnectionCall::AddTrack(TrackKind::Video),
            ConnectionCall::CreateOffer(OfferOptions::default()),
            ConnectionCall::SetLocal(SdpKind::Offer),
        ]
    );
    let link = session.snapshot().unwrap().peer(&viewer).cloned().unwrap();
    assert_eq!(link.signaling, SignalingState::HaveLocalOffer);

    // The viewer answers
    harness.transport.push(answer_from("v1", "viewer-answer")).await;
    assert!(
        wait_until(|| connection.remote_descriptions(SdpKind::Answer) == 1, 2000).await,
        "Answer was not applied"
    );
    let link = session.snapshot().unwrap().peer(&viewer).cloned().unwrap();
    assert_eq!(link.signaling, SignalingState::Stable);
    assert!(link.has_remote_description);

    // Candidates flow both ways
    connection.emit_candidate("candidate:1 1 udp 2122260223 10.0.0.1 50000 typ host");
    let candidates = harness.transport.wait_for_sent("ice_candidate", 1, 2000).await;
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["target_user_id"], "v1");
    assert_eq!(candidates[0]["candidate"]["sdpMLineIndex"], 0);

    harness
        .transport
        .push(candidate_from("v1", "candidate:2 1 udp 1 10.0.0.2 50001 typ host"))
        .await;
    assert!(
        wait_until(
            || connection
                .calls()
                .iter()
                .any(|c| matches!(c, ConnectionCall::AddIce(_))),
            2000
        )
        .await,
        "Remote candidate was not added"
    );

    session.cleanup();
}
