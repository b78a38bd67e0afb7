// Resolution Engine
//
// Each strategy can succeed once per session and only acts on a live
// circular wait. Preemption and kill must target a process that lies on some
// cycle. A strategy succeeds when no circular wait is left after it runs;
// only then is it spent and its penalty applied. The changes a strategy makes
// are never undone: a preemption that leaves another cycle standing keeps the
// resource released, and a kill that does the same keeps the process removed.
use super::events::{EngineEvent, ResolutionDetails};
use super::session::Session;
use super::strategy::Strategy;
use crate::detection::{CycleDetector, Detection};
use crate::error::{Error, Result};
use crate::model::{ProcessId, ResourceId};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub strategy: Strategy,
    pub details: ResolutionDetails,
    /// No cycle remained after the strategy ran.
    pub resolved: bool,
    /// Points deducted; zero when not resolved.
    pub penalty: u32,
    /// The cycle still standing when not resolved.
    pub remaining_cycle: Vec<ProcessId>,
}

impl Session {
    /// Takes `resource` away from `process` without terminating it.
    pub fn preempt(&mut self, process: &ProcessId, resource: &ResourceId) -> Result<ResolutionOutcome> {
        self.ensure_strategy(Strategy::Preemption)?;
        self.ensure_running()?;
        let pi = self.process_index(process)?;
        let ri = self.resource_index(resource)?;
        if !self.resources[ri].is_held_by(process) {
            return Err(Error::ResourceNotHeldByProcess {
                process: process.clone(),
                resource: resource.clone(),
            });
        }
        self.engage(process)?;

        self.release(pi, resource);
        info!("Preempted {} from {}", resource, process);

        self.conclude(
            Strategy::Preemption,
            ResolutionDetails::Preemption {
                process: process.clone(),
                resource: resource.clone(),
            },
        )
    }

    /// Terminates `process`, releasing everything it holds. The process is
    /// not counted as completed and cannot come back.
    pub fn kill(&mut self, process: &ProcessId) -> Result<ResolutionOutcome> {
        self.ensure_strategy(Strategy::Kill)?;
        self.ensure_running()?;
        let pi = self.process_index(process)?;
        self.engage(process)?;

        let released = self.release_all(pi);
        let killed = self.processes.remove(pi);
        self.terminated.push(killed.id);
        info!("Killed {}, released {:?}", process, released);

        self.conclude(
            Strategy::Kill,
            ResolutionDetails::Kill {
                process: process.clone(),
                released,
            },
        )
    }

    /// Releases every held resource and clears every allocation.
    pub fn rollback(&mut self) -> Result<ResolutionOutcome> {
        self.ensure_strategy(Strategy::Rollback)?;
        self.ensure_running()?;
        if !self.processes.iter().any(|p| p.holds_any()) {
            return Err(Error::NothingToRollBack);
        }
        let (detection, _) = self.live_deadlock()?;
        self.record_detection(&detection)?;

        let mut released = Vec::new();
        for pi in 0..self.processes.len() {
            let id = self.processes[pi].id.clone();
            released.extend(self.release_all(pi).into_iter().map(|r| (id.clone(), r)));
        }
        info!("Rolled back {} allocations", released.len());

        self.conclude(Strategy::Rollback, ResolutionDetails::Rollback { released })
    }

    /// The current circular wait and every process lying on some cycle.
    fn live_deadlock(&self) -> Result<(Detection, Vec<ProcessId>)> {
        let graph = self.wait_for_graph();
        let detection = CycleDetector::detect(&graph);
        if !detection.detected {
            return Err(Error::NoDeadlock);
        }
        Ok((detection, CycleDetector::processes_on_cycles(&graph)))
    }

    /// Validates that `target` is caught in a circular wait, then records the
    /// deadlock so it is active before the strategy touches anything.
    fn engage(&mut self, target: &ProcessId) -> Result<()> {
        let (detection, deadlocked) = self.live_deadlock()?;
        if !deadlocked.contains(target) {
            return Err(Error::NotDeadlocked(target.clone()));
        }
        // The flag was checked first, so this cannot end the session.
        self.record_detection(&detection)
    }

    fn conclude(&mut self, strategy: Strategy, details: ResolutionDetails) -> Result<ResolutionOutcome> {
        let detection = self.detect();

        if detection.detected {
            info!(
                "{} left a circular wait standing: {:?}",
                strategy, detection.cycle
            );
            // The flag is unspent, so this cannot end the session.
            self.record_detection(&detection)?;
            return Ok(ResolutionOutcome {
                strategy,
                details,
                resolved: false,
                penalty: 0,
                remaining_cycle: detection.cycle,
            });
        }

        let penalty = strategy.penalty();
        self.strategies.consume(strategy);
        self.score -= i64::from(penalty);
        self.deadlock.detected = false;
        self.deadlock.cycle.clear();
        self.deadlock.resolved = true;

        info!(
            "Deadlock resolved by {} (penalty {}, score {})",
            strategy, penalty, self.score
        );
        self.emit(EngineEvent::DeadlockResolved {
            method: strategy,
            details: details.clone(),
            penalty,
        });
        self.check_win(true);

        Ok(ResolutionOutcome {
            strategy,
            details,
            resolved: true,
            penalty,
            remaining_cycle: Vec::new(),
        })
    }
}
