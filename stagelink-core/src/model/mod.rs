mod description;
mod participant;
mod room;
mod signaling;

pub use description::{IceCandidateInit, SdpKind, SessionDescription};
pub use participant::{ParticipantId, Role, UserSummary};
pub use room::RoomId;
pub use signaling::{IceServerConfig, InboundSignal, OutboundSignal};
