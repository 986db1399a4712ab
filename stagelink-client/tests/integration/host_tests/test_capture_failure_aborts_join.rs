use stagelink_client::{MediaAccessError, SessionError};

use crate::integration::{create_test_session_with, init_tracing};
use crate::utils::MockMediaDevices;

#[tokio::test]
async fn test_capture_failure_aborts_join() {
    init_tracing();

    let (session, harness) = create_test_session_with(MockMediaDevices::denied());

    let result = session.join_as_host("room-1", None).await;
    assert!(
        matches!(
            result,
            Err(SessionError::MediaAccess(MediaAccessError::Denied(_)))
        ),
        "Expected denied capture, got {result:?}"
    );

    // Capture was requested with the configured constraints
    let requests = harness.devices.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].audio);
    let video = requests[0].video.expect("Video should be requested");
    assert_eq!((video.ideal_width, video.ideal_height), (1280, 720));

    // Nothing stays behind
    assert!(!session.is_active());
    assert!(harness.transport.client_closed().await);
    assert!(harness.peers.connections().is_empty());
}
