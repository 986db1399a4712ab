use crate::model::description::{IceCandidateInit, SessionDescription};
use crate::model::participant::{ParticipantId, UserSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Frames relayed to us by the signaling server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundSignal {
    UserJoined {
        user_id: ParticipantId,
        #[serde(default)]
        user_name: String,
    },
    UserLeft {
        user_id: ParticipantId,
    },
    Offer {
        offer: SessionDescription,
        sender_id: ParticipantId,
    },
    Answer {
        answer: SessionDescription,
        sender_id: ParticipantId,
    },
    IceCandidate {
        candidate: IceCandidateInit,
        sender_id: ParticipantId,
    },
    StreamEnded {
        #[serde(default)]
        message: Option<String>,
    },
    UserList {
        users: Vec<UserSummary>,
    },
    Error {
        error: String,
    },
    #[serde(other)]
    Unknown,
}

impl InboundSignal {
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Wire name of the frame, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundSignal::UserJoined { .. } => "user_joined",
            InboundSignal::UserLeft { .. } => "user_left",
            InboundSignal::Offer { .. } => "offer",
            InboundSignal::Answer { .. } => "answer",
            InboundSignal::IceCandidate { .. } => "ice_candidate",
            InboundSignal::StreamEnded { .. } => "stream_ended",
            InboundSignal::UserList { .. } => "user_list",
            InboundSignal::Error { .. } => "error",
            InboundSignal::Unknown => "unknown",
        }
    }
}

/// Frames we send; the server routes them by `target_user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundSignal {
    Offer {
        offer: SessionDescription,
        target_user_id: ParticipantId,
    },
    Answer {
        answer: SessionDescription,
        target_user_id: ParticipantId,
    },
    IceCandidate {
        candidate: IceCandidateInit,
        target_user_id: ParticipantId,
    },
    StreamEnded,
    GetUsers,
}

impl OutboundSignal {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn target(&self) -> Option<&ParticipantId> {
        match self {
            OutboundSignal::Offer { target_user_id, .. }
            | OutboundSignal::Answer { target_user_id, .. }
            | OutboundSignal::IceCandidate { target_user_id, .. } => Some(target_user_id),
            OutboundSignal::StreamEnded | OutboundSignal::GetUsers => None,
        }
    }
}
