pub use stagelink_core::model::{ParticipantId, Role, RoomId};

pub mod model {
    pub use stagelink_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use stagelink_client::*;
}

#[cfg(feature = "client")]
pub use stagelink_client::{ClientConfig, Session, SessionError, SessionObserver};
