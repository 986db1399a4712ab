use crate::media::RemoteStream;
use async_trait::async_trait;
use stagelink_core::{ParticipantId, UserSummary};

/// Receives what happens in a session. Every method defaults to doing nothing.
///
/// Notifications are awaited on the session's event loop, in the order the
/// frames and peer events that caused them arrived. While a method runs, no
/// other signaling or connectivity event of that session is handled, so
/// long-running work belongs in a task the implementation spawns itself.
///
/// Nothing is delivered after the session that owns the observer is torn
/// down, except the `on_stream_ended` that reports the teardown itself.
#[async_trait]
pub trait SessionObserver: Send + Sync + 'static {
    async fn on_remote_stream(&self, _stream: RemoteStream, _remote: ParticipantId) {}

    async fn on_stream_ended(&self) {}

    async fn on_user_joined(&self, _id: ParticipantId, _name: String) {}

    async fn on_user_left(&self, _id: ParticipantId) {}

    async fn on_user_list(&self, _users: Vec<UserSummary>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
