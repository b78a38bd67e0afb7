// Deadlock Detection Module
// Wait-for graph construction and cycle search over it

pub mod cycle;
pub mod wait_for;

pub use cycle::*;
pub use wait_for::*;

use crate::model::{Process, Resource};

/// Builds the wait-for graph for the given state and searches it for a cycle.
pub fn detect_deadlock(processes: &[Process], resources: &[Resource]) -> Detection {
    CycleDetector::detect(&WaitForGraph::build(processes, resources))
}
