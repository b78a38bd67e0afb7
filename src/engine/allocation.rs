// Allocation Engine
//
// Resources are released only by process completion, resolution strategies
// and process or resource removal. There is no general-purpose deallocate
// operation.
use super::events::EngineEvent;
use super::session::{CompletedProcess, Session};
use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::model::{Process, ProcessId, Resource, ResourceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub process: ProcessId,
    pub reward: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// Set when this allocation completed the process.
    pub completion: Option<Completion>,
    /// Detection run after the allocation, when the rules call for one.
    pub detection: Option<Detection>,
}

impl Session {
    /// Gives `resource` to `process`.
    ///
    /// On success the process may complete (releasing everything it holds),
    /// and deadlock detection runs if the rules ask for it. A detection that
    /// ends the session does not undo the allocation; the outcome still
    /// reports success and the end is visible through `status()` and the
    /// `SessionEnded` event.
    pub fn allocate(&mut self, process: &ProcessId, resource: &ResourceId) -> Result<AllocationOutcome> {
        self.ensure_running()?;
        let pi = self.process_index(process)?;
        let ri = self.resource_index(resource)?;

        if let Some(holder) = self.resources[ri].held_by() {
            if holder != process {
                return Err(Error::ResourceAlreadyHeld {
                    resource: resource.clone(),
                    holder: holder.clone(),
                });
            }
        }
        if !self.processes[pi].needs_resource(resource) {
            return Err(Error::NotNeeded {
                process: process.clone(),
                resource: resource.clone(),
            });
        }
        if self.processes[pi].holds(resource) || self.resources[ri].is_held_by(process) {
            return Err(Error::AlreadyAllocated {
                process: process.clone(),
                resource: resource.clone(),
            });
        }

        self.assign(pi, ri);
        debug!(
            "Allocated {} to {} ({}%)",
            resource,
            process,
            self.processes[pi].progress_percent()
        );
        self.emit(EngineEvent::ResourceAllocated {
            process: process.clone(),
            resource: resource.clone(),
        });

        let mut outcome = AllocationOutcome::default();
        if self.processes[pi].is_complete() {
            outcome.completion = Some(self.complete_process(pi));
            self.check_win(false);
        }

        if self.status.is_running() && self.config.rules.check_deadlock_on_allocate {
            let detection = self.detect();
            if let Err(err) = self.record_detection(&detection) {
                warn!("Allocation of {} to {} ended the session: {}", resource, process, err);
            }
            outcome.detection = Some(detection);
        }

        Ok(outcome)
    }

    /// Adds a process to the active set. It must start with no allocation and
    /// only need resources that exist; ids of finished processes stay retired.
    pub fn add_process(&mut self, process: Process) -> Result<()> {
        self.ensure_running()?;
        let retired = self.completed.iter().any(|c| c.process.id == process.id)
            || self.terminated.contains(&process.id)
            || self.removed.contains(&process.id);
        if retired || self.process(&process.id).is_some() {
            return Err(Error::DuplicateProcess(process.id));
        }
        process.validate()?;
        if process.holds_any() {
            return Err(Error::InvalidScenario(format!(
                "new process {} cannot start with an allocation",
                process.id
            )));
        }
        if let Some(unknown) = process.needs().iter().find(|r| self.resource(r).is_none()) {
            return Err(Error::InvalidScenario(format!(
                "process {} needs unknown resource {}",
                process.id, unknown
            )));
        }

        info!("Process {} added, needs {:?}", process.id, process.needs());
        self.processes.push(process);
        Ok(())
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<()> {
        self.ensure_running()?;
        if self.resource(&resource.id).is_some() {
            return Err(Error::DuplicateResource(resource.id));
        }
        if !resource.is_free() {
            return Err(Error::InvalidScenario(format!(
                "new resource {} cannot start held",
                resource.id
            )));
        }

        info!("Resource {} added", resource.id);
        self.resources.push(resource);
        Ok(())
    }

    /// Removes a resource and purges it from every process's needs and
    /// allocation. Processes left holding everything they still need complete.
    pub fn remove_resource(&mut self, resource: &ResourceId) -> Result<Vec<Completion>> {
        self.ensure_running()?;
        let ri = self.resource_index(resource)?;

        self.resources.remove(ri);
        for process in &mut self.processes {
            process.forget(resource);
        }
        info!("Resource {} removed", resource);

        let mut completions = Vec::new();
        while let Some(pi) = self.processes.iter().position(Process::is_complete) {
            completions.push(self.complete_process(pi));
        }
        self.check_win(false);
        self.refresh_detection(resource);

        Ok(completions)
    }

    /// Withdraws a process from the active set. Unlike `kill` this is not a
    /// resolution strategy: no flag is spent and no penalty applies. Its
    /// holdings are released and its id is retired.
    pub fn remove_process(&mut self, process: &ProcessId) -> Result<Vec<ResourceId>> {
        self.ensure_running()?;
        let pi = self.process_index(process)?;

        let released = self.release_all(pi);
        let removed = self.processes.remove(pi);
        self.removed.push(removed.id);
        info!("Process {} removed, released {:?}", process, released);

        self.check_win(false);
        self.refresh_detection(process);

        Ok(released)
    }

    /// Re-runs detection after an entity is removed, when a deadlock is on
    /// record or the rules check on every allocation.
    fn refresh_detection(&mut self, removed: &dyn fmt::Display) {
        if self.status.is_running()
            && (self.deadlock.detected || self.config.rules.check_deadlock_on_allocate)
        {
            let detection = self.detect();
            if let Err(err) = self.record_detection(&detection) {
                warn!("Removing {} ended the session: {}", removed, err);
            }
        }
    }

    /// The only place a resource becomes held.
    fn assign(&mut self, pi: usize, ri: usize) {
        let process_id = self.processes[pi].id.clone();
        let resource_id = self.resources[ri].id.clone();
        self.resources[ri].assign(process_id);
        self.processes[pi].grant(resource_id);
    }

    /// The only place a held resource is let go.
    pub(crate) fn release(&mut self, pi: usize, resource: &ResourceId) -> bool {
        let released = self.processes[pi].release(resource);
        if let Some(res) = self.resources.iter_mut().find(|r| &r.id == resource) {
            if res.is_held_by(&self.processes[pi].id) {
                res.clear();
            }
        }
        released
    }

    /// Releases everything the process holds, in allocation order.
    pub(crate) fn release_all(&mut self, pi: usize) -> Vec<ResourceId> {
        let held = self.processes[pi].allocation().to_vec();
        for resource in &held {
            self.release(pi, resource);
        }
        held
    }

    /// Moves a finished process out of the active set and pays its reward.
    fn complete_process(&mut self, pi: usize) -> Completion {
        self.release_all(pi);
        let process = self.processes.remove(pi);

        let needs = process.needs().len().max(1) as u32;
        let reward = self.config.scoring.reward_per_need.saturating_mul(needs);
        self.score += i64::from(reward);

        info!("Process {} completed, reward {}", process.id, reward);
        let completion = Completion {
            process: process.id.clone(),
            reward,
        };
        self.emit(EngineEvent::ProcessCompleted {
            process: process.clone(),
            reward,
        });
        self.completed.push(CompletedProcess { process, reward });
        completion
    }
}
