use crate::media::RemoteTrack;
use stagelink_core::{IceCandidateInit, ParticipantId};
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectivityState {
    /// States after which the link is considered lost.
    pub fn is_lost(self) -> bool {
        matches!(self, ConnectivityState::Disconnected | ConnectivityState::Failed)
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectivityState::New => "new",
            ConnectivityState::Connecting => "connecting",
            ConnectivityState::Connected => "connected",
            ConnectivityState::Disconnected => "disconnected",
            ConnectivityState::Failed => "failed",
            ConnectivityState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Events a peer connection raises for the session dispatcher.
#[derive(Debug, Clone)]
pub enum PeerEventKind {
    /// Local candidate gathered; relay it to the remote side.
    IceCandidate(IceCandidateInit),

    /// Remote media arrived.
    Track(RemoteTrack),

    ConnectivityChanged(ConnectivityState),
}

#[derive(Debug, Clone)]
pub struct PeerEvent {
    pub remote: ParticipantId,
    pub generation: u64,
    pub kind: PeerEventKind,
}

/// Handed to a connection at creation; tags everything it reports with the
/// link it belongs to.
#[derive(Debug, Clone)]
pub struct PeerEventSink {
    remote: ParticipantId,
    generation: u64,
    tx: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerEventSink {
    pub fn new(remote: ParticipantId, generation: u64, tx: mpsc::UnboundedSender<PeerEvent>) -> Self {
        Self {
            remote,
            generation,
            tx,
        }
    }

    pub fn remote(&self) -> &ParticipantId {
        &self.remote
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ice_candidate(&self, candidate: IceCandidateInit) {
        self.emit(PeerEventKind::IceCandidate(candidate));
    }

    pub fn track(&self, track: RemoteTrack) {
        self.emit(PeerEventKind::Track(track));
    }

    pub fn connectivity(&self, state: ConnectivityState) {
        self.emit(PeerEventKind::ConnectivityChanged(state));
    }

    fn emit(&self, kind: PeerEventKind) {
        // Session already gone.
        let _ = self.tx.send(PeerEvent {
            remote: self.remote.clone(),
            generation: self.generation,
            kind,
        });
    }
}
