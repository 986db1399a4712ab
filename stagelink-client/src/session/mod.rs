mod dispatcher;
mod negotiation;
mod observer;
mod session;
mod session_state;

pub use observer::*;
pub use session::*;
pub use session_state::{LocalParticipant, SessionSnapshot};
