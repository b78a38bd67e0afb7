// Wait-For Graph Construction
use crate::model::{Process, ProcessId, Resource, ResourceId};
use ahash::AHashMap;

/// Directed graph over active processes: `p -> q` when `p` needs a resource
/// it does not hold and `q` currently holds it.
///
/// Nodes live in an arena indexed by their position in the process list, so
/// traversal order is the process list order. Successors of a node follow the
/// order of the process's `needs`; several resources held by the same process
/// collapse into one edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitForGraph {
    nodes: Vec<ProcessId>,
    edges: Vec<Vec<usize>>,
}

impl WaitForGraph {
    pub fn build(processes: &[Process], resources: &[Resource]) -> Self {
        let index: AHashMap<&ProcessId, usize> = processes
            .iter()
            .enumerate()
            .map(|(i, p)| (&p.id, i))
            .collect();

        let holders: AHashMap<&ResourceId, &ProcessId> = resources
            .iter()
            .filter_map(|r| r.held_by().map(|holder| (&r.id, holder)))
            .collect();

        let mut edges = Vec::with_capacity(processes.len());
        for process in processes {
            let mut successors: Vec<usize> = Vec::new();
            for resource in process.outstanding() {
                let Some(holder) = holders.get(resource) else {
                    continue;
                };
                if *holder == &process.id {
                    continue;
                }
                if let Some(&target) = index.get(holder) {
                    if !successors.contains(&target) {
                        successors.push(target);
                    }
                }
            }
            edges.push(successors);
        }

        let graph = WaitForGraph {
            nodes: processes.iter().map(|p| p.id.clone()).collect(),
            edges,
        };
        tracing::debug!(
            "Built wait-for graph: {} nodes, {} edges",
            graph.len(),
            graph.edge_count()
        );
        graph
    }

    pub fn nodes(&self) -> &[ProcessId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Processes `process` waits for, in edge order. Empty for unknown ids.
    pub fn waits_for(&self, process: &ProcessId) -> Vec<&ProcessId> {
        self.nodes
            .iter()
            .position(|p| p == process)
            .map(|i| self.edges[i].iter().map(|&j| &self.nodes[j]).collect())
            .unwrap_or_default()
    }

    /// The whole graph as an ordered adjacency list.
    pub fn adjacency(&self) -> Vec<(ProcessId, Vec<ProcessId>)> {
        self.nodes
            .iter()
            .zip(&self.edges)
            .map(|(node, succ)| {
                (
                    node.clone(),
                    succ.iter().map(|&j| self.nodes[j].clone()).collect(),
                )
            })
            .collect()
    }

    pub(crate) fn successors(&self, node: usize) -> &[usize] {
        &self.edges[node]
    }

    pub(crate) fn node(&self, index: usize) -> &ProcessId {
        &self.nodes[index]
    }
}
