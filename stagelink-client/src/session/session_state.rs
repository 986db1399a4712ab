use crate::media::{LocalTrack, MediaLifecycle, RenderTarget};
use crate::peer::{PeerLinkSnapshot, PeerRegistry};
use crate::session::SessionObserver;
use crate::signaling::SignalingChannel;
use stagelink_core::{ParticipantId, Role, RoomId};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalParticipant {
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
}

impl LocalParticipant {
    pub fn new(role: Role) -> Self {
        Self {
            id: ParticipantId::generate(role),
            name: role.display_name().to_owned(),
            role,
        }
    }
}

/// Read-only view of the active session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub epoch: u64,
    pub room: RoomId,
    pub local: LocalParticipant,
    pub channel_open: bool,
    pub capture_active: bool,
    pub observer_attached: bool,
    pub peers: Vec<PeerLinkSnapshot>,
    pub remote_streams: Vec<ParticipantId>,
}

impl SessionSnapshot {
    pub fn peer(&self, remote: &ParticipantId) -> Option<&PeerLinkSnapshot> {
        self.peers.iter().find(|p| &p.remote == remote)
    }
}

/// Everything one join owns; released as a unit by [`ActiveSession::teardown`].
pub(crate) struct ActiveSession {
    pub(crate) epoch: u64,
    pub(crate) room: RoomId,
    pub(crate) local: LocalParticipant,
    pub(crate) channel: SignalingChannel,
    pub(crate) media: MediaLifecycle,
    pub(crate) registry: Arc<PeerRegistry>,
    pub(crate) observer: Option<Arc<dyn SessionObserver>>,
    pub(crate) render_target: Option<Arc<dyn RenderTarget>>,
    pub(crate) shutdown: Option<oneshot::Sender<()>>,
}

impl ActiveSession {
    pub(crate) fn peer_context(&self) -> PeerContext {
        PeerContext {
            role: self.local.role,
            registry: self.registry.clone(),
            tracks: self.media.tracks(),
            capture_active: self.media.is_active(),
            observer: self.observer.clone(),
            render_target: self.render_target.clone(),
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            epoch: self.epoch,
            room: self.room.clone(),
            local: self.local.clone(),
            channel_open: self.channel.is_open(),
            capture_active: self.media.is_active(),
            observer_attached: self.observer.is_some(),
            peers: self.registry.snapshots(),
            remote_streams: self.registry.remote_stream_owners(),
        }
    }

    /// Releases capture, peer links and the channel, and stops the dispatcher.
    /// Returns the detached observer.
    pub(crate) fn teardown(mut self) -> Option<Arc<dyn SessionObserver>> {
        self.media.stop_local_capture();
        self.registry.remove_all();
        self.channel.close();
        self.shutdown.take();
        self.render_target.take();
        info!("Session {} in room {} torn down", self.local.id, self.room);
        self.observer.take()
    }
}

/// Per-call copy of what negotiation handlers need, taken under the state lock.
pub(crate) struct PeerContext {
    pub(crate) role: Role,
    pub(crate) registry: Arc<PeerRegistry>,
    pub(crate) tracks: Vec<LocalTrack>,
    pub(crate) capture_active: bool,
    pub(crate) observer: Option<Arc<dyn SessionObserver>>,
    pub(crate) render_target: Option<Arc<dyn RenderTarget>>,
}
