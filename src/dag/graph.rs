// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{RascalError, Result};
use crate::model::{Subroutine, SubroutineId};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Subroutines that must complete before this one can become active.
    deps: Vec<SubroutineId>,
    /// Subroutines waiting on this one.
    dependents: Vec<SubroutineId>,
}

/// Dependency graph over the subroutines of one decomposition.
#[derive(Debug, Clone)]
pub struct SubroutineGraph {
    nodes: HashMap<SubroutineId, DagNode>,
    order: Vec<SubroutineId>,
}

impl SubroutineGraph {
    /// Build the graph from the subroutines' predecessor links.
    ///
    /// Fails if a predecessor is not part of `subroutines` or if the links
    /// contain a cycle.
    pub fn from_subroutines(subroutines: &[Subroutine]) -> Result<Self> {
        let mut nodes: HashMap<SubroutineId, DagNode> = subroutines
            .iter()
            .map(|s| {
                (
                    s.id().to_string(),
                    DagNode {
                        deps: s.predecessors().to_vec(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        // Edge direction: predecessor -> subroutine.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for s in subroutines {
            graph.add_node(s.id());
        }

        for s in subroutines {
            for pred in s.predecessors() {
                match nodes.get_mut(pred) {
                    Some(node) => node.dependents.push(s.id().to_string()),
                    None => return Err(RascalError::SubroutineNotFound(pred.clone())),
                }
                graph.add_edge(pred.as_str(), s.id(), ());
            }
        }

        let order = match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(|s| s.to_string()).collect(),
            Err(cycle) => {
                return Err(RascalError::DagCycle(format!(
                    "cycle detected in subroutine DAG involving '{}'",
                    cycle.node_id()
                )));
            }
        };

        Ok(Self { nodes, order })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Subroutine ids in a dependency-respecting order.
    pub fn topological_order(&self) -> &[SubroutineId] {
        &self.order
    }

    /// Immediate predecessors of a subroutine.
    pub fn dependencies_of(&self, id: &str) -> &[SubroutineId] {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a subroutine.
    pub fn dependents_of(&self, id: &str) -> &[SubroutineId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Subroutines with no predecessors.
    pub fn roots(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| self.dependencies_of(id).is_empty())
            .map(|s| s.as_str())
            .collect()
    }
}
