mod devices;
mod lifecycle;
mod render;
mod track;

pub use devices::*;
pub use lifecycle::*;
pub use render::*;
pub use track::*;
