// Game Session State
use super::events::{EngineEvent, EventSink};
use super::strategy::{Strategy, StrategyAvailability};
use crate::config::{EngineConfig, WinCondition};
use crate::detection::{CycleDetector, Detection, WaitForGraph};
use crate::error::{Error, Result};
use crate::levels::LevelDefinition;
use crate::model::{Process, ProcessId, Resource, ResourceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_running(&self) -> bool {
        *self == SessionStatus::Running
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    AllProcessesCompleted,
    DeadlockResolved,
    NoStrategiesRemaining,
    TimeExpired,
}

impl fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionEndReason::AllProcessesCompleted => "All processes completed",
            SessionEndReason::DeadlockResolved => "Deadlock resolved",
            SessionEndReason::NoStrategiesRemaining => {
                "No more strategies available to resolve deadlock"
            }
            SessionEndReason::TimeExpired => "Time is up",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlockPhase {
    NoDeadlock,
    DeadlockActive,
    DeadlockResolved,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlockState {
    pub detected: bool,
    pub cycle: Vec<ProcessId>,
    pub resolved: bool,
}

impl DeadlockState {
    pub fn phase(&self) -> DeadlockPhase {
        if self.detected {
            DeadlockPhase::DeadlockActive
        } else if self.resolved {
            DeadlockPhase::DeadlockResolved
        } else {
            DeadlockPhase::NoDeadlock
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedProcess {
    pub process: Process,
    pub reward: u32,
}

/// Read-only copy of a session handed to renderers and other collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub level: Option<u32>,
    pub status: SessionStatus,
    pub end_reason: Option<SessionEndReason>,
    pub score: i64,
    pub processes: Vec<Process>,
    pub resources: Vec<Resource>,
    pub completed: Vec<CompletedProcess>,
    pub terminated: Vec<ProcessId>,
    #[serde(default)]
    pub removed: Vec<ProcessId>,
    pub deadlock: DeadlockState,
    pub phase: DeadlockPhase,
    pub strategies: StrategyAvailability,
    pub started_at: DateTime<Utc>,
}

/// One play-through: the process and resource collections plus deadlock,
/// strategy and score bookkeeping.
///
/// Every mutation goes through a method on this type; `held_by` and
/// `allocation` are never written by callers. Operations run to completion
/// synchronously and report validation failures without touching state.
pub struct Session {
    pub(crate) id: Uuid,
    pub(crate) config: EngineConfig,
    pub(crate) level: Option<u32>,
    pub(crate) processes: Vec<Process>,
    pub(crate) resources: Vec<Resource>,
    pub(crate) completed: Vec<CompletedProcess>,
    pub(crate) terminated: Vec<ProcessId>,
    /// Withdrawn through `remove_process`.
    pub(crate) removed: Vec<ProcessId>,
    pub(crate) deadlock: DeadlockState,
    pub(crate) strategies: StrategyAvailability,
    pub(crate) score: i64,
    pub(crate) status: SessionStatus,
    pub(crate) end_reason: Option<SessionEndReason>,
    pub(crate) started_at: DateTime<Utc>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("level", &self.level)
            .field("status", &self.status)
            .field("score", &self.score)
            .field("processes", &self.processes.len())
            .field("resources", &self.resources.len())
            .field("deadlock", &self.deadlock)
            .field("strategies", &self.strategies)
            .finish()
    }
}

impl Session {
    /// Starts a session over the given scenario.
    ///
    /// Processes may arrive with partial allocations as long as every
    /// resource's `held_by` agrees with them.
    pub fn start(
        processes: Vec<Process>,
        resources: Vec<Resource>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        validate_scenario(&processes, &resources)?;

        let session = Session {
            id: Uuid::new_v4(),
            config,
            level: None,
            processes,
            resources,
            completed: Vec::new(),
            terminated: Vec::new(),
            removed: Vec::new(),
            deadlock: DeadlockState::default(),
            strategies: StrategyAvailability::default(),
            score: 0,
            status: SessionStatus::Running,
            end_reason: None,
            started_at: Utc::now(),
            sinks: Vec::new(),
        };

        info!(
            "Session {} started with {} processes and {} resources",
            session.id,
            session.processes.len(),
            session.resources.len()
        );
        Ok(session)
    }

    /// Starts a session from a level definition; the level's rules override
    /// the corresponding fields of `config`.
    pub fn start_level(level: &LevelDefinition, mut config: EngineConfig) -> Result<Self> {
        config.rules.check_deadlock_on_allocate = level.checks_deadlock;
        config.rules.win_condition = level.win_condition;

        let mut session = Self::start(level.processes.clone(), level.resources.clone(), config)?;
        session.level = Some(level.id);
        info!("Session {} playing level {} ({})", session.id, level.id, level.title);
        Ok(session)
    }

    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn level(&self) -> Option<u32> {
        self.level
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn process(&self, id: &ProcessId) -> Option<&Process> {
        self.processes.iter().find(|p| &p.id == id)
    }

    pub fn resource(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.iter().find(|r| &r.id == id)
    }

    pub fn completed(&self) -> &[CompletedProcess] {
        &self.completed
    }

    pub fn terminated(&self) -> &[ProcessId] {
        &self.terminated
    }

    pub fn removed(&self) -> &[ProcessId] {
        &self.removed
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn end_reason(&self) -> Option<SessionEndReason> {
        self.end_reason
    }

    pub fn deadlock(&self) -> &DeadlockState {
        &self.deadlock
    }

    pub fn phase(&self) -> DeadlockPhase {
        self.deadlock.phase()
    }

    pub fn strategies(&self) -> StrategyAvailability {
        self.strategies
    }

    pub fn wait_for_graph(&self) -> WaitForGraph {
        WaitForGraph::build(&self.processes, &self.resources)
    }

    /// Every active process on some cycle, not only the reported one.
    pub fn deadlocked_processes(&self) -> Vec<ProcessId> {
        CycleDetector::processes_on_cycles(&self.wait_for_graph())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            level: self.level,
            status: self.status,
            end_reason: self.end_reason,
            score: self.score,
            processes: self.processes.clone(),
            resources: self.resources.clone(),
            completed: self.completed.clone(),
            terminated: self.terminated.clone(),
            removed: self.removed.clone(),
            deadlock: self.deadlock.clone(),
            phase: self.deadlock.phase(),
            strategies: self.strategies,
            started_at: self.started_at,
        }
    }

    /// Runs detection and records the outcome in the deadlock state.
    ///
    /// A deadlock found while every strategy is spent ends the session and
    /// returns `NoStrategiesRemaining`. A session that has already ended
    /// answers with `SessionEnded`.
    pub fn check_deadlock(&mut self) -> Result<Detection> {
        self.ensure_running()?;
        let detection = self.detect();
        self.record_detection(&detection)?;
        Ok(detection)
    }

    /// Terminal transition driven by an external countdown.
    pub fn expire_time(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.end(SessionStatus::Failed, SessionEndReason::TimeExpired);
        Ok(())
    }

    pub(crate) fn detect(&self) -> Detection {
        CycleDetector::detect(&self.wait_for_graph())
    }

    pub(crate) fn record_detection(&mut self, detection: &Detection) -> Result<()> {
        if !detection.detected {
            if self.deadlock.detected {
                info!("Session {}: circular wait cleared", self.id);
                self.deadlock.detected = false;
                self.deadlock.cycle.clear();
            }
            return Ok(());
        }

        let is_new = !self.deadlock.detected || self.deadlock.cycle != detection.cycle;
        self.deadlock.detected = true;
        self.deadlock.cycle = detection.cycle.clone();

        if is_new {
            self.deadlock.resolved = false;
            warn!(
                "Session {}: deadlock detected, cycle {:?}",
                self.id, detection.cycle
            );
            self.emit(EngineEvent::DeadlockDetected {
                cycle: detection.cycle.clone(),
                strategies_remaining: self.strategies.remaining(),
            });
        }

        if !self.strategies.any() {
            self.end(SessionStatus::Failed, SessionEndReason::NoStrategiesRemaining);
            return Err(Error::NoStrategiesRemaining);
        }

        Ok(())
    }

    /// Ends the session as won when the win condition holds. Returns whether it ended.
    pub(crate) fn check_win(&mut self, deadlock_just_resolved: bool) -> bool {
        if !self.status.is_running() {
            return false;
        }
        if self.processes.is_empty() {
            self.end(SessionStatus::Completed, SessionEndReason::AllProcessesCompleted);
            return true;
        }
        if deadlock_just_resolved
            && self.config.rules.win_condition
                == WinCondition::AllProcessesCompletedOrDeadlockResolved
        {
            self.end(SessionStatus::Completed, SessionEndReason::DeadlockResolved);
            return true;
        }
        false
    }

    pub(crate) fn end(&mut self, status: SessionStatus, reason: SessionEndReason) {
        self.status = status;
        self.end_reason = Some(reason);
        match status {
            SessionStatus::Failed => warn!(
                "Session {} failed: {} (score {})",
                self.id, reason, self.score
            ),
            _ => info!(
                "Session {} ended {}: {} (score {})",
                self.id, status, reason, self.score
            ),
        }
        self.emit(EngineEvent::SessionEnded {
            status,
            reason,
            score: self.score,
        });
    }

    pub(crate) fn ensure_running(&self) -> Result<()> {
        if self.status.is_running() {
            Ok(())
        } else {
            Err(Error::SessionEnded(self.status))
        }
    }

    /// Fails with `StrategyUnavailable` (and tells collaborators) when the
    /// strategy has already been spent.
    pub(crate) fn ensure_strategy(&self, strategy: Strategy) -> Result<()> {
        if self.strategies.is_available(strategy) {
            return Ok(());
        }
        info!("Session {}: {} strategy already used", self.id, strategy);
        self.emit(EngineEvent::StrategyUnavailable { strategy });
        Err(Error::StrategyUnavailable(strategy))
    }

    pub(crate) fn process_index(&self, id: &ProcessId) -> Result<usize> {
        self.processes
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| Error::ProcessNotFound(id.clone()))
    }

    pub(crate) fn resource_index(&self, id: &ResourceId) -> Result<usize> {
        self.resources
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| Error::ResourceNotFound(id.clone()))
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        for sink in &self.sinks {
            sink.publish(&event);
        }
    }
}

fn validate_scenario(processes: &[Process], resources: &[Resource]) -> Result<()> {
    let mut resource_ids = HashSet::new();
    for resource in resources {
        if !resource_ids.insert(&resource.id) {
            return Err(Error::DuplicateResource(resource.id.clone()));
        }
    }

    let mut process_ids = HashSet::new();
    for process in processes {
        if !process_ids.insert(&process.id) {
            return Err(Error::DuplicateProcess(process.id.clone()));
        }
        process.validate()?;
        if let Some(unknown) = process.needs().iter().find(|r| !resource_ids.contains(r)) {
            return Err(Error::InvalidScenario(format!(
                "process {} needs unknown resource {}",
                process.id, unknown
            )));
        }
        if process.is_complete() {
            return Err(Error::InvalidScenario(format!(
                "process {} already holds everything it needs",
                process.id
            )));
        }
        for held in process.allocation() {
            let holder = resources
                .iter()
                .find(|r| &r.id == held)
                .and_then(|r| r.held_by());
            if holder != Some(&process.id) {
                return Err(Error::InvalidScenario(format!(
                    "process {} lists {} as allocated but the resource disagrees",
                    process.id, held
                )));
            }
        }
    }

    for resource in resources {
        if let Some(holder) = resource.held_by() {
            let holds = processes
                .iter()
                .find(|p| &p.id == holder)
                .map(|p| p.holds(&resource.id))
                .unwrap_or(false);
            if !holds {
                return Err(Error::InvalidScenario(format!(
                    "resource {} is held by {} which does not list it",
                    resource.id, holder
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resources(ids: &[&str]) -> Vec<Resource> {
        ids.iter().map(|id| Resource::named(id)).collect()
    }

    #[test]
    fn test_start_rejects_duplicates_and_unknown_needs() {
        let dup = Session::start(
            vec![Process::needing("P1", ["R1"]), Process::needing("P1", ["R1"])],
            resources(&["R1"]),
            EngineConfig::default(),
        );
        assert!(matches!(dup, Err(Error::DuplicateProcess(_))));

        let dup_res = Session::start(
            vec![Process::needing("P1", ["R1"])],
            resources(&["R1", "R1"]),
            EngineConfig::default(),
        );
        assert!(matches!(dup_res, Err(Error::DuplicateResource(_))));

        let unknown = Session::start(
            vec![Process::needing("P1", ["R9"])],
            resources(&["R1"]),
            EngineConfig::default(),
        );
        assert!(matches!(unknown, Err(Error::InvalidScenario(_))));
    }

    #[test]
    fn test_start_rejects_inconsistent_holdings() {
        let resource: Resource =
            serde_json::from_str(r#"{"id":"R1","name":"CPU","held_by":"P2"}"#).unwrap();
        let result = Session::start(
            vec![Process::needing("P1", ["R1"]), Process::needing("P2", ["R2"])],
            vec![resource, Resource::named("R2")],
            EngineConfig::default(),
        );
        assert!(matches!(result, Err(Error::InvalidScenario(_))));
    }

    #[test]
    fn test_fresh_session_state() {
        let session = Session::start(
            vec![Process::needing("P1", ["R1"])],
            resources(&["R1"]),
            EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(session.status(), SessionStatus::Running);
        assert_eq!(session.phase(), DeadlockPhase::NoDeadlock);
        assert_eq!(session.score(), 0);
        assert!(session.strategies().any());

        let snapshot = session.snapshot();
        assert_eq!(snapshot.processes.len(), 1);
        assert_eq!(snapshot.phase, DeadlockPhase::NoDeadlock);
    }

    #[test]
    fn test_expire_time_is_terminal() {
        let mut session = Session::start(
            vec![Process::needing("P1", ["R1"])],
            resources(&["R1"]),
            EngineConfig::default(),
        )
        .unwrap();

        session.expire_time().unwrap();
        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.end_reason(), Some(SessionEndReason::TimeExpired));
        assert!(matches!(
            session.expire_time(),
            Err(Error::SessionEnded(SessionStatus::Failed))
        ));
        assert!(matches!(
            session.check_deadlock(),
            Err(Error::SessionEnded(SessionStatus::Failed))
        ));
    }

    #[test]
    fn test_deadlock_phase_derivation() {
        let mut state = DeadlockState::default();
        assert_eq!(state.phase(), DeadlockPhase::NoDeadlock);
        state.detected = true;
        assert_eq!(state.phase(), DeadlockPhase::DeadlockActive);
        state.detected = false;
        state.resolved = true;
        assert_eq!(state.phase(), DeadlockPhase::DeadlockResolved);
    }
}
