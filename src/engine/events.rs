//! Outbound engine events
//!
//! The engine never talks to a renderer or UI directly. Collaborators register
//! an [`EventSink`] on the session and receive every event synchronously, in
//! the order the state changes happened.

use super::session::{SessionEndReason, SessionStatus};
use super::strategy::Strategy;
use crate::model::{Process, ProcessId, ResourceId};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

/// What a resolution strategy touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ResolutionDetails {
    Preemption {
        process: ProcessId,
        resource: ResourceId,
    },
    Kill {
        process: ProcessId,
        released: Vec<ResourceId>,
    },
    Rollback {
        released: Vec<(ProcessId, ResourceId)>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ResourceAllocated {
        process: ProcessId,
        resource: ResourceId,
    },
    ProcessCompleted {
        process: Process,
        reward: u32,
    },
    DeadlockDetected {
        cycle: Vec<ProcessId>,
        strategies_remaining: Vec<Strategy>,
    },
    DeadlockResolved {
        method: Strategy,
        details: ResolutionDetails,
        penalty: u32,
    },
    StrategyUnavailable {
        strategy: Strategy,
    },
    SessionEnded {
        status: SessionStatus,
        reason: SessionEndReason,
        score: i64,
    },
}

/// Receiver of engine events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &EngineEvent);
}

impl<F> EventSink for F
where
    F: Fn(&EngineEvent) + Send + Sync,
{
    fn publish(&self, event: &EngineEvent) {
        self(event)
    }
}

/// Forwards events into a crossbeam channel.
pub struct ChannelSink {
    sender: Sender<EngineEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<EngineEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: &EngineEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!("Event receiver dropped, discarding {:?}", event);
        }
    }
}
