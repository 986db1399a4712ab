use crate::error::NegotiationError;
use crate::peer::{ConnectivityState, PeerConnection};
use stagelink_core::ParticipantId;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalingState::Stable => "stable",
            SignalingState::HaveLocalOffer => "have-local-offer",
            SignalingState::HaveRemoteOffer => "have-remote-offer",
            SignalingState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingEvent {
    LocalOffer,
    RemoteOffer,
    RemoteAnswer,
    LocalAnswer,
    Close,
}

impl fmt::Display for SignalingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalingEvent::LocalOffer => "local offer",
            SignalingEvent::RemoteOffer => "remote offer",
            SignalingEvent::RemoteAnswer => "remote answer",
            SignalingEvent::LocalAnswer => "local answer",
            SignalingEvent::Close => "close",
        };
        f.write_str(name)
    }
}

impl SignalingState {
    /// Next state, or `None` when `event` is not allowed here.
    pub fn next(self, event: SignalingEvent) -> Option<SignalingState> {
        use SignalingEvent as E;
        use SignalingState as S;

        match (self, event) {
            (_, E::Close) => Some(S::Closed),
            (S::Stable, E::LocalOffer) => Some(S::HaveLocalOffer),
            (S::Stable, E::RemoteOffer) => Some(S::HaveRemoteOffer),
            (S::HaveLocalOffer, E::RemoteAnswer) => Some(S::Stable),
            (S::HaveRemoteOffer, E::LocalAnswer) => Some(S::Stable),
            _ => None,
        }
    }
}

/// Cheap handle to a link, valid while its generation is current.
#[derive(Clone)]
pub struct LinkHandle {
    pub remote: ParticipantId,
    pub generation: u64,
    pub connection: Arc<dyn PeerConnection>,
}

impl fmt::Debug for LinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkHandle")
            .field("remote", &self.remote)
            .field("generation", &self.generation)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerLinkSnapshot {
    pub remote: ParticipantId,
    pub generation: u64,
    pub signaling: SignalingState,
    pub connectivity: ConnectivityState,
    pub has_remote_description: bool,
}

/// Negotiation state of the connection to one remote participant.
pub struct PeerLink {
    remote: ParticipantId,
    generation: u64,
    connection: Arc<dyn PeerConnection>,
    signaling: SignalingState,
    connectivity: ConnectivityState,
    has_local_description: bool,
    has_remote_description: bool,
}

impl PeerLink {
    pub fn new(remote: ParticipantId, generation: u64, connection: Arc<dyn PeerConnection>) -> Self {
        Self {
            remote,
            generation,
            connection,
            signaling: SignalingState::Stable,
            connectivity: ConnectivityState::New,
            has_local_description: false,
            has_remote_description: false,
        }
    }

    pub fn remote(&self) -> &ParticipantId {
        &self.remote
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn signaling(&self) -> SignalingState {
        self.signaling
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.connectivity
    }

    pub fn has_remote_description(&self) -> bool {
        self.has_remote_description
    }

    /// Only a link that never negotiated may take a remote offer in place.
    pub fn is_fresh(&self) -> bool {
        self.signaling == SignalingState::Stable
            && !self.has_local_description
            && !self.has_remote_description
    }

    pub fn handle(&self) -> LinkHandle {
        LinkHandle {
            remote: self.remote.clone(),
            generation: self.generation,
            connection: self.connection.clone(),
        }
    }

    /// Applies a validated transition; an illegal one leaves the link untouched.
    pub fn apply(&mut self, event: SignalingEvent) -> Result<SignalingState, NegotiationError> {
        let next = self
            .signaling
            .next(event)
            .ok_or(NegotiationError::InvalidTransition {
                from: self.signaling,
                event,
            })?;

        match event {
            SignalingEvent::LocalOffer | SignalingEvent::LocalAnswer => {
                self.has_local_description = true
            }
            SignalingEvent::RemoteOffer | SignalingEvent::RemoteAnswer => {
                self.has_remote_description = true
            }
            SignalingEvent::Close => {}
        }

        debug!(
            "Peer link {} (gen {}): {} -> {} on {}",
            self.remote, self.generation, self.signaling, next, event
        );
        self.signaling = next;
        Ok(next)
    }

    /// Undoes a claimed remote answer that the connection rejected.
    pub fn rollback_remote_answer(&mut self) {
        if self.signaling == SignalingState::Stable {
            self.signaling = SignalingState::HaveLocalOffer;
            self.has_remote_description = false;
        }
    }

    pub fn set_connectivity(&mut self, state: ConnectivityState) {
        self.connectivity = state;
    }

    /// Closes the connection; repeated calls are no-ops.
    pub fn close(&mut self) {
        if self.signaling == SignalingState::Closed {
            return;
        }
        self.signaling = SignalingState::Closed;
        self.connectivity = ConnectivityState::Closed;
        self.connection.close();
        debug!("Peer link {} (gen {}) closed", self.remote, self.generation);
    }

    pub fn snapshot(&self) -> PeerLinkSnapshot {
        PeerLinkSnapshot {
            remote: self.remote.clone(),
            generation: self.generation,
            signaling: self.signaling,
            connectivity: self.connectivity,
            has_remote_description: self.has_remote_description,
        }
    }
}
