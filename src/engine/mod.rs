// Deadlock Game Engine
// Session state, allocation, resolution strategies and outbound events

pub mod allocation;
pub mod events;
pub mod handle;
pub mod resolution;
pub mod session;
pub mod strategy;

pub use allocation::*;
pub use events::*;
pub use handle::*;
pub use resolution::*;
pub use session::*;
pub use strategy::*;
