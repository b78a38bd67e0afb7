//! Deadlock Solver Core
//!
//! Deadlock detection and resolution engine for an operating-systems teaching
//! game: processes request unit resources, a wait-for graph is derived from
//! who holds what, circular waits are detected by depth-first search, and
//! one-shot preemption, kill and rollback strategies break them.
//!
//! ```
//! use deadlock_solver_core::{EngineConfig, Process, ProcessId, Resource, ResourceId, Session};
//!
//! let mut session = Session::start(
//!     vec![Process::needing("P1", ["R1", "R2"]), Process::needing("P2", ["R2", "R1"])],
//!     vec![Resource::named("R1"), Resource::named("R2")],
//!     EngineConfig::default(),
//! )?;
//! session.allocate(&ProcessId::new("P1"), &ResourceId::new("R1"))?;
//! session.allocate(&ProcessId::new("P2"), &ResourceId::new("R2"))?;
//! assert!(session.check_deadlock()?.detected);
//!
//! session.rollback()?;
//! assert!(!session.check_deadlock()?.detected);
//! # Ok::<(), deadlock_solver_core::Error>(())
//! ```

pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod levels;
pub mod logging;
pub mod model;
pub mod scenario;

pub use config::{ConfigBuilder, EngineConfig, WinCondition};
pub use detection::{detect_deadlock, CycleDetector, Detection, WaitForGraph};
pub use engine::{
    AllocationOutcome, ChannelSink, DeadlockPhase, EngineEvent, EventSink, ResolutionOutcome,
    Session, SessionHandle, SessionSnapshot, SessionStatus, Strategy,
};
pub use error::{Error, Result};
pub use model::{Process, ProcessId, Resource, ResourceId};
