mod channel;
mod token;
mod transport;
mod ws_transport;

pub use channel::*;
pub use token::*;
pub use transport::*;
pub use ws_transport::*;
