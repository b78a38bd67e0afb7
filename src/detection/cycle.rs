// Deadlock Detection
use super::wait_for::WaitForGraph;
use crate::model::ProcessId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Result of one detection pass.
///
/// `cycle` lists the processes of one circular wait in wait order; the last
/// process waits for the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub detected: bool,
    pub cycle: Vec<ProcessId>,
}

impl Detection {
    pub fn none() -> Self {
        Detection::default()
    }

    /// The cycle with its first process repeated at the end.
    pub fn closed_path(&self) -> Vec<ProcessId> {
        let mut path = self.cycle.clone();
        if let Some(first) = self.cycle.first() {
            path.push(first.clone());
        }
        path
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

pub struct CycleDetector;

impl CycleDetector {
    /// Depth-first search from each unvisited node in process list order,
    /// stopping at the first back edge. Further disjoint cycles are only
    /// reported by later passes, once the first has been broken.
    pub fn detect(graph: &WaitForGraph) -> Detection {
        let mut marks = vec![Mark::Unvisited; graph.len()];
        // (node, index of the next successor to visit)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..graph.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::OnStack;
            stack.push((root, 0));

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let successors = graph.successors(node);
                if top.1 == successors.len() {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                }

                let neighbor = successors[top.1];
                top.1 += 1;

                match marks[neighbor] {
                    Mark::Unvisited => {
                        marks[neighbor] = Mark::OnStack;
                        stack.push((neighbor, 0));
                    }
                    Mark::OnStack => {
                        let start = stack
                            .iter()
                            .position(|&(n, _)| n == neighbor)
                            .unwrap_or(0);
                        let cycle = stack[start..]
                            .iter()
                            .map(|&(n, _)| graph.node(n).clone())
                            .collect();
                        return Detection {
                            detected: true,
                            cycle,
                        };
                    }
                    Mark::Done => {}
                }
            }
        }

        Detection::none()
    }

    /// Every process that lies on at least one cycle, in process list order.
    ///
    /// Diagnostic view of the whole deadlock when several circular waits
    /// exist at once; `detect` still reports one cycle at a time.
    pub fn processes_on_cycles(graph: &WaitForGraph) -> Vec<ProcessId> {
        (0..graph.len())
            .filter(|&node| Self::reaches(graph, node, node))
            .map(|node| graph.node(node).clone())
            .collect()
    }

    fn reaches(graph: &WaitForGraph, from: usize, target: usize) -> bool {
        let mut seen = vec![false; graph.len()];
        let mut queue: VecDeque<usize> = graph.successors(from).iter().copied().collect();

        while let Some(node) = queue.pop_front() {
            if node == target {
                return true;
            }
            if seen[node] {
                continue;
            }
            seen[node] = true;
            queue.extend(graph.successors(node).iter().copied());
        }
        false
    }
}
