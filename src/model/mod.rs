// Entity Model
// Processes, unit resources and the identifiers that tie them together

pub mod process;
pub mod resource;
pub mod types;

pub use process::*;
pub use resource::*;
pub use types::*;
