use crate::peer::{SignalingEvent, SignalingState};
use stagelink_core::{ParticipantId, RoomId};
use thiserror::Error;

/// Signaling transport could not be opened, or is no longer open.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to obtain a signaling token")]
    Token(#[source] anyhow::Error),

    #[error("authentication token not found")]
    EmptyToken,

    #[error("failed to open signaling transport for room {room}")]
    Transport {
        room: RoomId,
        #[source]
        source: anyhow::Error,
    },

    #[error("signaling channel is closed")]
    ChannelClosed,

    #[error("failed to encode signaling frame")]
    Encode(#[from] serde_json::Error),
}

/// Camera/microphone could not be acquired.
#[derive(Debug, Error)]
pub enum MediaAccessError {
    #[error("camera/microphone access denied: {0}")]
    Denied(String),

    #[error("no camera/microphone available")]
    Unavailable,

    #[error("capture device failed")]
    Device(#[source] anyhow::Error),
}

/// Per-peer negotiation failure. Never surfaced to callers.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("{event} is not valid in signaling state {from}")]
    InvalidTransition {
        from: SignalingState,
        event: SignalingEvent,
    },

    #[error("peer connection is in the wrong state: {0}")]
    InvalidState(String),

    #[error("peer link for {0} was superseded")]
    Superseded(ParticipantId),

    #[error("session is closed")]
    SessionClosed,

    #[error(transparent)]
    Signaling(#[from] ConnectionError),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Playback could not start on a render target; a warning, not a failure.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback blocked: {0}")]
    Blocked(String),

    #[error("playback aborted")]
    Aborted,
}

/// Errors a join or end operation hands back to its caller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    MediaAccess(#[from] MediaAccessError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}
