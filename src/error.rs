use crate::engine::{SessionStatus, Strategy};
use crate::model::{ProcessId, ResourceId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(ProcessId),

    #[error("Resource not found: {0}")]
    ResourceNotFound(ResourceId),

    #[error("Resource {resource} is already held by {holder}")]
    ResourceAlreadyHeld {
        resource: ResourceId,
        holder: ProcessId,
    },

    #[error("Process {process} does not need resource {resource}")]
    NotNeeded {
        process: ProcessId,
        resource: ResourceId,
    },

    #[error("Resource {resource} is already allocated to process {process}")]
    AlreadyAllocated {
        process: ProcessId,
        resource: ResourceId,
    },

    #[error("Resource {resource} is not held by process {process}")]
    ResourceNotHeldByProcess {
        process: ProcessId,
        resource: ResourceId,
    },

    #[error("{0} strategy already used this session")]
    StrategyUnavailable(Strategy),

    #[error("No more strategies available to resolve deadlock")]
    NoStrategiesRemaining,

    #[error("No deadlock to resolve")]
    NoDeadlock,

    #[error("Process {0} is not part of a deadlock")]
    NotDeadlocked(ProcessId),

    #[error("Nothing to roll back: no process holds a resource")]
    NothingToRollBack,

    #[error("Session has ended ({0})")]
    SessionEnded(SessionStatus),

    #[error("Duplicate process id: {0}")]
    DuplicateProcess(ProcessId),

    #[error("Duplicate resource id: {0}")]
    DuplicateResource(ResourceId),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
