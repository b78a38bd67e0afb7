use crossbeam_channel::Receiver;
use deadlock_solver_core::config::ConfigBuilder;
use deadlock_solver_core::engine::{
    ChannelSink, DeadlockPhase, EngineEvent, ResolutionDetails, Session, SessionEndReason,
    SessionStatus, Strategy,
};
use deadlock_solver_core::{EngineConfig, Error, Process, ProcessId, Resource, ResourceId};

fn pid(id: &str) -> ProcessId {
    ProcessId::new(id)
}

fn rid(id: &str) -> ResourceId {
    ResourceId::new(id)
}

fn resources(count: usize) -> Vec<Resource> {
    (1..=count).map(|i| Resource::named(&format!("R{}", i))).collect()
}

fn observed(mut session: Session) -> (Session, Receiver<EngineEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    session.subscribe(ChannelSink::new(tx));
    (session, rx)
}

/// Scenario A: two processes requesting the same pair in opposite order.
fn scenario_a() -> (Session, Receiver<EngineEvent>) {
    let session = Session::start(
        vec![
            Process::needing("P1", ["R1", "R2"]),
            Process::needing("P2", ["R2", "R1"]),
        ],
        resources(2),
        EngineConfig::default(),
    )
    .unwrap();
    let (mut session, rx) = observed(session);

    session.allocate(&pid("P1"), &rid("R1")).unwrap();
    assert!(matches!(
        session.allocate(&pid("P2"), &rid("R1")),
        Err(Error::ResourceAlreadyHeld { .. })
    ));
    session.allocate(&pid("P2"), &rid("R2")).unwrap();
    assert!(matches!(
        session.allocate(&pid("P1"), &rid("R2")),
        Err(Error::ResourceAlreadyHeld { .. })
    ));
    assert!(matches!(
        session.allocate(&pid("P2"), &rid("R1")),
        Err(Error::ResourceAlreadyHeld { .. })
    ));

    (session, rx)
}

#[test]
fn scenario_a_detects_circular_wait() {
    let (mut session, rx) = scenario_a();

    let detection = session.check_deadlock().unwrap();
    assert!(detection.detected);
    assert_eq!(detection.cycle, vec![pid("P1"), pid("P2")]);
    assert_eq!(session.phase(), DeadlockPhase::DeadlockActive);

    let graph = session.wait_for_graph();
    assert_eq!(graph.waits_for(&pid("P1")), vec![&pid("P2")]);
    assert_eq!(graph.waits_for(&pid("P2")), vec![&pid("P1")]);

    let detected: Vec<_> = rx
        .try_iter()
        .filter(|e| matches!(e, EngineEvent::DeadlockDetected { .. }))
        .collect();
    // Raised once by the allocation; the explicit check sees the same cycle.
    assert_eq!(detected.len(), 1);
}

#[test]
fn repeated_checks_are_identical() {
    let (mut session, _rx) = scenario_a();
    let before = session.snapshot();

    let first = session.check_deadlock().unwrap();
    let second = session.check_deadlock().unwrap();
    assert_eq!(first, second);
    assert_eq!(session.snapshot(), before);
}

#[test]
fn scenario_b_rollback_clears_everything() {
    let (mut session, rx) = scenario_a();
    session.check_deadlock().unwrap();
    rx.try_iter().for_each(drop);

    let outcome = session.rollback().unwrap();
    assert!(outcome.resolved);
    assert_eq!(outcome.penalty, 30);

    assert!(session.resources().iter().all(|r| r.is_free()));
    assert!(session.processes().iter().all(|p| p.allocation().is_empty()));
    assert_eq!(session.processes().len(), 2);

    assert!(!session.check_deadlock().unwrap().detected);
    assert!(!session.strategies().is_available(Strategy::Rollback));
    assert_eq!(session.score(), -30);
    assert_eq!(session.phase(), DeadlockPhase::DeadlockResolved);

    let events: Vec<_> = rx.try_iter().collect();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::DeadlockResolved {
            method: Strategy::Rollback,
            details: ResolutionDetails::Rollback { .. },
            penalty: 30,
        }
    )));
}

#[test]
fn scenario_c_single_need_completes_once() {
    let session = Session::start(
        vec![Process::needing("P", ["R1"])],
        resources(1),
        EngineConfig::default(),
    )
    .unwrap();
    let (mut session, rx) = observed(session);

    let outcome = session.allocate(&pid("P"), &rid("R1")).unwrap();
    let completion = outcome.completion.unwrap();
    assert_eq!(completion.process, pid("P"));
    assert!(completion.reward > 0);

    assert!(session.process(&pid("P")).is_none());
    assert!(session.resource(&rid("R1")).unwrap().is_free());
    assert_eq!(session.score(), i64::from(completion.reward));

    let completed: Vec<_> = rx
        .try_iter()
        .filter(|e| matches!(e, EngineEvent::ProcessCompleted { .. }))
        .collect();
    assert_eq!(completed.len(), 1);

    assert_eq!(session.status(), SessionStatus::Completed);
    assert!(matches!(
        session.allocate(&pid("P"), &rid("R1")),
        Err(Error::SessionEnded(SessionStatus::Completed))
    ));
}

/// Eight processes in four deadlocking pairs; each of the first three pairs
/// is resolved with a different strategy.
fn exhaust_strategies(check_on_allocate: bool) -> Session {
    let config = ConfigBuilder::new()
        .check_deadlock_on_allocate(check_on_allocate)
        .build()
        .unwrap();
    let mut processes = Vec::new();
    for pair in 0..4 {
        let a = format!("R{}", pair * 2 + 1);
        let b = format!("R{}", pair * 2 + 2);
        processes.push(Process::needing(
            &format!("P{}", pair * 2 + 1),
            [a.clone(), b.clone()],
        ));
        processes.push(Process::needing(&format!("P{}", pair * 2 + 2), [b, a]));
    }
    let mut session = Session::start(processes, resources(8), config).unwrap();

    session.allocate(&pid("P1"), &rid("R1")).unwrap();
    session.allocate(&pid("P2"), &rid("R2")).unwrap();
    assert!(session.check_deadlock().unwrap().detected);
    assert!(session.preempt(&pid("P1"), &rid("R1")).unwrap().resolved);

    session.allocate(&pid("P3"), &rid("R3")).unwrap();
    session.allocate(&pid("P4"), &rid("R4")).unwrap();
    assert_eq!(
        session.check_deadlock().unwrap().cycle,
        vec![pid("P3"), pid("P4")]
    );
    assert!(session.kill(&pid("P4")).unwrap().resolved);

    session.allocate(&pid("P5"), &rid("R5")).unwrap();
    session.allocate(&pid("P6"), &rid("R6")).unwrap();
    assert!(session.check_deadlock().unwrap().detected);
    assert!(session.rollback().unwrap().resolved);

    assert!(!session.strategies().any());
    assert_eq!(session.score(), -100);
    session
}

#[test]
fn scenario_d_no_strategies_left_is_fatal() {
    let session = exhaust_strategies(false);
    let (mut session, rx) = observed(session);

    session.allocate(&pid("P7"), &rid("R7")).unwrap();
    session.allocate(&pid("P8"), &rid("R8")).unwrap();
    let before = session.snapshot();

    assert!(matches!(
        session.preempt(&pid("P7"), &rid("R7")),
        Err(Error::StrategyUnavailable(Strategy::Preemption))
    ));
    assert!(matches!(
        session.kill(&pid("P7")),
        Err(Error::StrategyUnavailable(Strategy::Kill))
    ));
    assert!(matches!(
        session.rollback(),
        Err(Error::StrategyUnavailable(Strategy::Rollback))
    ));
    assert_eq!(session.snapshot(), before);

    assert!(matches!(
        session.check_deadlock(),
        Err(Error::NoStrategiesRemaining)
    ));
    assert_eq!(session.status(), SessionStatus::Failed);
    assert_eq!(
        session.end_reason(),
        Some(SessionEndReason::NoStrategiesRemaining)
    );

    assert!(matches!(
        session.allocate(&pid("P1"), &rid("R1")),
        Err(Error::SessionEnded(SessionStatus::Failed))
    ));

    let events: Vec<_> = rx.try_iter().collect();
    let unavailable = events
        .iter()
        .filter(|e| matches!(e, EngineEvent::StrategyUnavailable { .. }))
        .count();
    assert_eq!(unavailable, 3);
    assert!(matches!(
        events.last(),
        Some(EngineEvent::SessionEnded {
            status: SessionStatus::Failed,
            reason: SessionEndReason::NoStrategiesRemaining,
            score: -100,
        })
    ));
}

#[test]
fn allocation_into_unresolvable_deadlock_ends_session() {
    let mut session = exhaust_strategies(true);

    session.allocate(&pid("P7"), &rid("R7")).unwrap();
    let outcome = session.allocate(&pid("P8"), &rid("R8")).unwrap();

    assert!(outcome.detection.unwrap().detected);
    assert_eq!(session.status(), SessionStatus::Failed);
    assert!(session.resource(&rid("R8")).unwrap().is_held_by(&pid("P8")));
    assert!(matches!(
        session.check_deadlock(),
        Err(Error::SessionEnded(SessionStatus::Failed))
    ));
    assert!(matches!(
        session.kill(&pid("P7")),
        Err(Error::StrategyUnavailable(Strategy::Kill))
    ));
}

/// Two disjoint circular waits: {P1, P2} and {P3, P4}.
fn two_cycles() -> Session {
    let mut session = Session::start(
        vec![
            Process::needing("P1", ["R1", "R2"]),
            Process::needing("P2", ["R2", "R1"]),
            Process::needing("P3", ["R3", "R4"]),
            Process::needing("P4", ["R4", "R3"]),
        ],
        resources(4),
        EngineConfig::default(),
    )
    .unwrap();
    for (p, r) in [("P1", "R1"), ("P2", "R2"), ("P3", "R3"), ("P4", "R4")] {
        session.allocate(&pid(p), &rid(r)).unwrap();
    }
    session
}

#[test]
fn multi_cycle_reports_first_and_lists_all() {
    let session = two_cycles();
    assert_eq!(session.deadlock().cycle, vec![pid("P1"), pid("P2")]);
    assert_eq!(
        session.deadlocked_processes(),
        vec![pid("P1"), pid("P2"), pid("P3"), pid("P4")]
    );
}

#[test]
fn failed_preemption_keeps_resource_released() {
    let mut session = two_cycles();

    let outcome = session.preempt(&pid("P1"), &rid("R1")).unwrap();
    assert!(!outcome.resolved);
    assert_eq!(outcome.penalty, 0);
    assert_eq!(outcome.remaining_cycle, vec![pid("P3"), pid("P4")]);

    assert!(session.resource(&rid("R1")).unwrap().is_free());
    assert!(!session.process(&pid("P1")).unwrap().holds(&rid("R1")));
    assert!(session.strategies().is_available(Strategy::Preemption));
    assert_eq!(session.score(), 0);
    assert_eq!(session.phase(), DeadlockPhase::DeadlockActive);
    assert_eq!(session.deadlock().cycle, vec![pid("P3"), pid("P4")]);

    // The second cycle can still be broken with the same strategy.
    let outcome = session.preempt(&pid("P3"), &rid("R3")).unwrap();
    assert!(outcome.resolved);
    assert_eq!(session.score(), -20);
    assert_eq!(session.phase(), DeadlockPhase::DeadlockResolved);
}

#[test]
fn failed_kill_keeps_process_removed() {
    let mut session = two_cycles();

    let outcome = session.kill(&pid("P2")).unwrap();
    assert!(!outcome.resolved);
    assert!(session.process(&pid("P2")).is_none());
    assert!(session.resource(&rid("R2")).unwrap().is_free());
    assert!(session.strategies().is_available(Strategy::Kill));

    let outcome = session.kill(&pid("P4")).unwrap();
    assert!(outcome.resolved);
    assert_eq!(outcome.penalty, 50);
    assert_eq!(session.terminated(), &[pid("P2"), pid("P4")]);
}

#[test]
fn new_deadlock_rearms_resolved_flag() {
    let mut session = two_cycles();
    session.rollback().unwrap();
    assert!(session.deadlock().resolved);

    session.allocate(&pid("P1"), &rid("R1")).unwrap();
    session.allocate(&pid("P2"), &rid("R2")).unwrap();
    assert!(session.deadlock().detected);
    assert!(!session.deadlock().resolved);
    assert_eq!(session.phase(), DeadlockPhase::DeadlockActive);
}

#[test]
fn completing_after_preemption_frees_the_way() {
    let (mut session, _rx) = scenario_a();
    session.preempt(&pid("P1"), &rid("R1")).unwrap();

    let outcome = session.allocate(&pid("P2"), &rid("R1")).unwrap();
    assert_eq!(outcome.completion.unwrap().reward, 100);

    session.allocate(&pid("P1"), &rid("R1")).unwrap();
    session.allocate(&pid("P1"), &rid("R2")).unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);
    assert_eq!(session.score(), 200 - 20);
    assert_eq!(session.completed().len(), 2);
}
