// Shared Session Handle
use super::allocation::AllocationOutcome;
use super::resolution::ResolutionOutcome;
use super::session::{Session, SessionSnapshot};
use crate::detection::Detection;
use crate::error::Result;
use crate::model::{ProcessId, ResourceId};
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable handle for collaborators living on other threads.
///
/// Readers get snapshots; every mutation is forwarded to the session's own
/// operations under the write lock, so each call stays atomic.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        SessionHandle {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().snapshot()
    }

    pub fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn allocate(&self, process: &ProcessId, resource: &ResourceId) -> Result<AllocationOutcome> {
        self.inner.write().allocate(process, resource)
    }

    pub fn preempt(&self, process: &ProcessId, resource: &ResourceId) -> Result<ResolutionOutcome> {
        self.inner.write().preempt(process, resource)
    }

    pub fn kill(&self, process: &ProcessId) -> Result<ResolutionOutcome> {
        self.inner.write().kill(process)
    }

    pub fn rollback(&self) -> Result<ResolutionOutcome> {
        self.inner.write().rollback()
    }

    pub fn check_deadlock(&self) -> Result<Detection> {
        self.inner.write().check_deadlock()
    }

    pub fn expire_time(&self) -> Result<()> {
        self.inner.write().expire_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{Process, Resource};
    use std::thread;

    #[test]
    fn test_handle_shared_across_threads() {
        let session = Session::start(
            (1..=4)
                .map(|i| Process::needing(&format!("P{}", i), [format!("R{}", i)]))
                .collect(),
            (1..=4).map(|i| Resource::named(&format!("R{}", i))).collect(),
            EngineConfig::default(),
        )
        .unwrap();
        let handle = SessionHandle::new(session);

        let workers: Vec<_> = (1..=4)
            .map(|i| {
                let h = handle.clone();
                thread::spawn(move || {
                    h.allocate(
                        &ProcessId::new(format!("P{}", i)),
                        &ResourceId::new(format!("R{}", i)),
                    )
                    .unwrap()
                })
            })
            .collect();
        for worker in workers {
            assert!(worker.join().unwrap().completion.is_some());
        }

        let snapshot = handle.snapshot();
        assert!(snapshot.processes.is_empty());
        assert_eq!(snapshot.completed.len(), 4);
        assert_eq!(handle.read(|s| s.score()), 200);
    }
}
