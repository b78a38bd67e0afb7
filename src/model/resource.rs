// Unit Resources
use super::types::*;
use serde::{Deserialize, Serialize};

/// A single-unit resource: free, or held by exactly one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    held_by: Option<ProcessId>,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>, name: impl Into<String>, icon: impl Into<String>) -> Self {
        Resource {
            id: id.into(),
            name: name.into(),
            icon: icon.into(),
            held_by: None,
        }
    }

    pub fn named(id: &str) -> Self {
        Resource::new(id, id, "")
    }

    pub fn held_by(&self) -> Option<&ProcessId> {
        self.held_by.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.held_by.is_none()
    }

    pub fn is_held_by(&self, process: &ProcessId) -> bool {
        self.held_by.as_ref() == Some(process)
    }

    pub(crate) fn assign(&mut self, process: ProcessId) {
        debug_assert!(self.held_by.is_none());
        self.held_by = Some(process);
    }

    pub(crate) fn clear(&mut self) -> Option<ProcessId> {
        self.held_by.take()
    }
}
