use bytes::Bytes;
use stagelink_core::ParticipantId;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl From<RTPCodecType> for TrackKind {
    fn from(kind: RTPCodecType) -> Self {
        match kind {
            RTPCodecType::Audio => TrackKind::Audio,
            _ => TrackKind::Video,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Captured track shared by every peer link of the host.
///
/// Clones share the same underlying track and liveness flag, so stopping any
/// clone stops them all.
#[derive(Clone)]
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    inner: Arc<TrackLocalStaticSample>,
    live: Arc<AtomicBool>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, inner: Arc<TrackLocalStaticSample>) -> Self {
        Self {
            id: inner.id().to_owned(),
            kind,
            inner,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Ends capture; later writes fail.
    pub fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            debug!("Stopped local {} track {}", self.kind, self.id);
        }
    }

    pub fn rtc(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.inner.clone()
    }

    /// Feeds one encoded frame to every peer link carrying this track.
    pub async fn write_sample(&self, data: Bytes, duration: Duration) -> anyhow::Result<()> {
        if !self.is_live() {
            anyhow::bail!("local {} track {} is stopped", self.kind, self.id);
        }
        self.inner
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("live", &self.is_live())
            .finish()
    }
}

/// The host's capture: one optional audio and one optional video track.
#[derive(Debug, Clone)]
pub struct LocalMediaStream {
    pub id: String,
    pub tracks: Vec<LocalTrack>,
}

impl LocalMediaStream {
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(LocalTrack::is_live)
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
    pub stream_id: String,
    rtc: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    pub fn from_rtc(track: Arc<TrackRemote>) -> Self {
        Self {
            id: track.id().to_string(),
            kind: TrackKind::from(track.kind()),
            stream_id: track.stream_id().to_string(),
            rtc: Some(track),
        }
    }

    /// Track with no RTP source behind it, for backends that deliver media elsewhere.
    pub fn detached(id: impl Into<String>, kind: TrackKind, stream_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            stream_id: stream_id.into(),
            rtc: None,
        }
    }

    /// RTP reader for the track, when it came from a real peer connection.
    pub fn rtc(&self) -> Option<&Arc<TrackRemote>> {
        self.rtc.as_ref()
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

/// Media received from one remote participant.
#[derive(Debug, Clone)]
pub struct RemoteStream {
    pub id: String,
    pub participant: ParticipantId,
    pub tracks: Vec<RemoteTrack>,
}

impl RemoteStream {
    pub fn new(participant: ParticipantId, first: RemoteTrack) -> Self {
        Self {
            id: first.stream_id.clone(),
            participant,
            tracks: vec![first],
        }
    }

    /// Adds or replaces a track by id.
    pub fn add_track(&mut self, track: RemoteTrack) {
        match self.tracks.iter_mut().find(|t| t.id == track.id) {
            Some(existing) => *existing = track,
            None => self.tracks.push(track),
        }
    }

    pub fn has_kind(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }
}
