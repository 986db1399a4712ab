mod config;
mod error;
pub mod media;
pub mod peer;
mod session;
pub mod signaling;

pub use config::*;
pub use error::*;
pub use session::*;
