mod connection;
mod link;
mod peer_event;
mod registry;
mod rtc_connection;

pub use connection::*;
pub use link::*;
pub use peer_event::*;
pub use registry::*;
pub use rtc_connection::*;
