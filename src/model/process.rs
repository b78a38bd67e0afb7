// Process Records
use super::types::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A process that must hold every resource in `needs` before it can complete.
///
/// `needs` keeps its insertion order; that order drives wait-for edge order
/// and therefore which cycle detection reports first. `allocation` is always
/// a duplicate-free subset of `needs` and is only changed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    needs: Vec<ResourceId>,
    #[serde(default)]
    allocation: Vec<ResourceId>,
}

impl Process {
    pub fn new(
        id: impl Into<ProcessId>,
        name: impl Into<String>,
        icon: impl Into<String>,
        needs: impl IntoIterator<Item = ResourceId>,
    ) -> Self {
        Process {
            id: id.into(),
            name: name.into(),
            icon: icon.into(),
            needs: needs.into_iter().collect(),
            allocation: Vec::new(),
        }
    }

    /// Shorthand used by level data and tests: name defaults to the id.
    pub fn needing<I, R>(id: &str, needs: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceId>,
    {
        Process::new(id, id, "", needs.into_iter().map(Into::into))
    }

    pub fn needs(&self) -> &[ResourceId] {
        &self.needs
    }

    pub fn allocation(&self) -> &[ResourceId] {
        &self.allocation
    }

    pub fn needs_resource(&self, resource: &ResourceId) -> bool {
        self.needs.contains(resource)
    }

    pub fn holds(&self, resource: &ResourceId) -> bool {
        self.allocation.contains(resource)
    }

    pub fn holds_any(&self) -> bool {
        !self.allocation.is_empty()
    }

    /// Every need is held. A process whose needs were all removed counts as complete.
    pub fn is_complete(&self) -> bool {
        self.needs.iter().all(|r| self.allocation.contains(r))
    }

    pub fn progress(&self) -> f64 {
        if self.needs.is_empty() {
            return 1.0;
        }
        self.allocation.len() as f64 / self.needs.len() as f64
    }

    pub fn progress_percent(&self) -> u8 {
        (self.progress() * 100.0).round() as u8
    }

    /// Needed resources not yet held, in `needs` order.
    pub fn outstanding(&self) -> impl Iterator<Item = &ResourceId> + '_ {
        self.needs.iter().filter(move |r| !self.allocation.contains(r))
    }

    pub fn validate(&self) -> Result<()> {
        if self.needs.is_empty() {
            return Err(Error::InvalidScenario(format!(
                "process {} needs no resources",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for resource in &self.needs {
            if !seen.insert(resource) {
                return Err(Error::InvalidScenario(format!(
                    "process {} lists resource {} twice in its needs",
                    self.id, resource
                )));
            }
        }

        let mut held = HashSet::new();
        for resource in &self.allocation {
            if !self.needs.contains(resource) {
                return Err(Error::InvalidScenario(format!(
                    "process {} holds {} without needing it",
                    self.id, resource
                )));
            }
            if !held.insert(resource) {
                return Err(Error::InvalidScenario(format!(
                    "process {} holds resource {} twice",
                    self.id, resource
                )));
            }
        }

        Ok(())
    }

    pub(crate) fn grant(&mut self, resource: ResourceId) {
        debug_assert!(self.needs.contains(&resource));
        debug_assert!(!self.allocation.contains(&resource));
        self.allocation.push(resource);
    }

    pub(crate) fn release(&mut self, resource: &ResourceId) -> bool {
        let before = self.allocation.len();
        self.allocation.retain(|r| r != resource);
        self.allocation.len() != before
    }

    pub(crate) fn release_all(&mut self) -> Vec<ResourceId> {
        std::mem::take(&mut self.allocation)
    }

    /// Drops a resource from both `needs` and `allocation`.
    pub(crate) fn forget(&mut self, resource: &ResourceId) {
        self.needs.retain(|r| r != resource);
        self.allocation.retain(|r| r != resource);
    }
}
