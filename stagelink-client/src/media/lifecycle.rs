use crate::error::{MediaAccessError, PlaybackError};
use crate::media::{LocalMediaStream, LocalTrack, MediaConstraints, MediaDevices, RenderTarget};
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the host's local capture for one active session.
pub struct MediaLifecycle {
    devices: Arc<dyn MediaDevices>,
    constraints: MediaConstraints,
    stream: Option<LocalMediaStream>,
}

impl MediaLifecycle {
    pub fn new(devices: Arc<dyn MediaDevices>, constraints: MediaConstraints) -> Self {
        Self {
            devices,
            constraints,
            stream: None,
        }
    }

    /// Acquires capture and shows it on the preview target.
    ///
    /// A preview that refuses to play is only a warning; the capture itself is
    /// still returned.
    pub async fn start_local_capture(
        &mut self,
        preview: Option<&dyn RenderTarget>,
    ) -> Result<LocalMediaStream, MediaAccessError> {
        self.stop_local_capture();

        let stream = self.devices.get_user_media(&self.constraints).await?;
        info!(
            "Local capture {} started with {} tracks",
            stream.id,
            stream.tracks.len()
        );

        if let Some(target) = preview {
            target.attach_local(&stream);
            match target.play().await {
                Ok(()) | Err(PlaybackError::Aborted) => {}
                Err(e) => warn!("Local preview did not start: {}", e),
            }
        }

        self.stream = Some(stream.clone());
        Ok(stream)
    }

    pub fn stop_local_capture(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop();
            info!("Local capture {} stopped", stream.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(LocalMediaStream::is_active)
    }

    /// Tracks to attach to a new peer link; empty when not capturing.
    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.stream
            .as_ref()
            .filter(|s| s.is_active())
            .map(|s| s.tracks.clone())
            .unwrap_or_default()
    }

    pub fn stream(&self) -> Option<&LocalMediaStream> {
        self.stream.as_ref()
    }
}

impl Drop for MediaLifecycle {
    fn drop(&mut self) {
        self.stop_local_capture();
    }
}
