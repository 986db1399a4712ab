use crate::error::NegotiationError;
use crate::media::LocalTrack;
use crate::peer::PeerEventSink;
use async_trait::async_trait;
use stagelink_core::{IceCandidateInit, SessionDescription};
use std::sync::Arc;

/// What an offer asks the remote side to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferOptions {
    pub receive_audio: bool,
    pub receive_video: bool,
}

impl Default for OfferOptions {
    fn default() -> Self {
        Self {
            receive_audio: true,
            receive_video: true,
        }
    }
}

/// One WebRTC peer connection as the negotiation code drives it.
///
/// Errors caused by calling a method in the wrong signaling state must be
/// reported as [`NegotiationError::InvalidState`].
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn add_track(&self, track: &LocalTrack) -> Result<(), NegotiationError>;

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), NegotiationError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), NegotiationError>;

    /// Starts closing; must not block and must tolerate repeated calls.
    fn close(&self);
}

#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(&self, events: PeerEventSink) -> Result<Arc<dyn PeerConnection>, NegotiationError>;
}
