use crate::config::VideoConstraints;
use crate::error::MediaAccessError;
use crate::media::{LocalMediaStream, LocalTrack, TrackKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// What a capture request asks for; `video: None` means audio only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: Option<VideoConstraints>,
}

impl MediaConstraints {
    pub fn is_empty(&self) -> bool {
        !self.audio && self.video.is_none()
    }
}

/// Source of local capture.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<LocalMediaStream, MediaAccessError>;
}

/// Platform with no capture hardware; hosts cannot start here.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMediaDevices;

#[async_trait]
impl MediaDevices for NoMediaDevices {
    async fn get_user_media(
        &self,
        _constraints: &MediaConstraints,
    ) -> Result<LocalMediaStream, MediaAccessError> {
        Err(MediaAccessError::Unavailable)
    }
}

/// Sample-fed capture: the application pushes encoded Opus and VP8 frames
/// through [`LocalTrack::write_sample`].
#[derive(Debug, Default)]
pub struct StaticSampleDevices {
    next_stream: AtomicU64,
}

impl StaticSampleDevices {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(kind: TrackKind, stream_id: &str) -> LocalTrack {
        let capability = match kind {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                sdp_fmtp_line: "minptime=10;useinbandfec=1".to_owned(),
                rtcp_feedback: vec![],
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                channels: 0,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: vec![],
            },
        };
        let inner = Arc::new(TrackLocalStaticSample::new(
            capability,
            format!("{kind}-{stream_id}"),
            stream_id.to_owned(),
        ));
        LocalTrack::new(kind, inner)
    }
}

#[async_trait]
impl MediaDevices for StaticSampleDevices {
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<LocalMediaStream, MediaAccessError> {
        if constraints.is_empty() {
            return Err(MediaAccessError::Unavailable);
        }

        let n = self.next_stream.fetch_add(1, Ordering::SeqCst) + 1;
        let stream_id = format!("stagelink-{n}");
        let mut tracks = Vec::with_capacity(2);

        if constraints.audio {
            tracks.push(Self::track(TrackKind::Audio, &stream_id));
        }
        if let Some(video) = constraints.video {
            debug!(
                "Video capture requested at {}x{}",
                video.ideal_width, video.ideal_height
            );
            tracks.push(Self::track(TrackKind::Video, &stream_id));
        }

        info!("Created sample capture {} with {} tracks", stream_id, tracks.len());
        Ok(LocalMediaStream {
            id: stream_id,
            tracks,
        })
    }
}
