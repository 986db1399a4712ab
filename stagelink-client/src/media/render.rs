use crate::error::PlaybackError;
use crate::media::{LocalMediaStream, RemoteStream};
use async_trait::async_trait;

/// Where a session puts video: the host's self-preview or a viewer's player.
#[async_trait]
pub trait RenderTarget: Send + Sync {
    fn attach_local(&self, stream: &LocalMediaStream);

    /// Called again with the grown stream each time a track arrives.
    fn attach_remote(&self, stream: &RemoteStream);

    /// Id of the stream currently attached, if any.
    fn source_id(&self) -> Option<String>;

    async fn play(&self) -> Result<(), PlaybackError>;
}
