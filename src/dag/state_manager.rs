// src/dag/state_manager.rs

//! Per-run state management for nodes in the scheduler.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::graph::PipelineGraph;
use crate::dag::node_info::{NodeInfo, RunState};
use crate::engine::NodeName;

/// Manages per-run state transitions for nodes.
pub struct StateManager<'a> {
    graph: &'a PipelineGraph,
    nodes: &'a mut HashMap<NodeName, NodeInfo>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a PipelineGraph, nodes: &'a mut HashMap<NodeName, NodeInfo>) -> Self {
        Self { graph, nodes }
    }

    /// Put every node of the graph into the run as `Pending`.
    pub fn mark_all_pending(&mut self) {
        for info in self.nodes.values_mut() {
            info.run_state = Some(RunState::Pending);
        }
    }

    /// Mark every not-yet-started transitive dependent of a failed node as
    /// `Skipped`.
    ///
    /// Returns the nodes that were newly skipped (excluding the failed node).
    pub fn mark_dependents_skipped(&mut self, failed: &str) -> Vec<NodeName> {
        let mut newly_skipped = Vec::new();

        for name in self.graph.transitive_dependents(failed) {
            if let Some(info) = self.nodes.get_mut(&name) {
                match info.run_state {
                    Some(RunState::Pending) | Some(RunState::Ready) => {
                        info.run_state = Some(RunState::Skipped);
                        debug!(
                            node = %info.name,
                            upstream = %failed,
                            "skipping dependent of failed node"
                        );
                        newly_skipped.push(name);
                    }
                    Some(RunState::Running) => {
                        // Cannot happen: a dependent only runs after its
                        // upstream succeeded.
                        warn!(
                            node = %info.name,
                            upstream = %failed,
                            "dependent of failed node is running"
                        );
                    }
                    _ => {}
                }
            }
        }

        newly_skipped
    }

    /// Mark every node that has not started as `Skipped`.
    pub fn skip_unstarted(&mut self) -> Vec<NodeName> {
        let mut skipped: Vec<NodeName> = self
            .nodes
            .values_mut()
            .filter(|info| {
                matches!(
                    info.run_state,
                    Some(RunState::Pending) | Some(RunState::Ready)
                )
            })
            .map(|info| {
                info.run_state = Some(RunState::Skipped);
                info.name.clone()
            })
            .collect();
        skipped.sort();
        skipped
    }

    /// Collect `Pending` nodes whose dependencies all succeeded and mark them
    /// `Ready`, in graph insertion order.
    pub fn collect_new_ready_nodes(&mut self) -> Vec<NodeName> {
        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<NodeName> = self
            .graph
            .node_names()
            .filter(|name| {
                self.nodes.get(*name).is_some_and(|info| {
                    matches!(info.run_state, Some(RunState::Pending))
                        && ReadOnlyStateManager::new(self.nodes).deps_satisfied_for_info(info)
                })
            })
            .map(str::to_string)
            .collect();

        for name in &candidates {
            if let Some(info) = self.nodes.get_mut(name) {
                debug!(node = %info.name, "dependencies satisfied; marking Ready");
                info.run_state = Some(RunState::Ready);
            }
        }

        candidates
    }

    /// Check if all nodes are in a terminal state.
    pub fn all_nodes_terminal(&self) -> bool {
        !self.nodes.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Ready) | Some(RunState::Running)
            )
        })
    }
}

/// A read-only view for checking dependency satisfaction.
pub struct ReadOnlyStateManager<'a> {
    nodes: &'a HashMap<NodeName, NodeInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(nodes: &'a HashMap<NodeName, NodeInfo>) -> Self {
        Self { nodes }
    }

    /// A node may start only once every direct dependency succeeded in this
    /// run.
    pub fn deps_satisfied_for_info(&self, info: &NodeInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.nodes.get(dep_name) {
            Some(dep) => matches!(dep.run_state, Some(RunState::DoneSuccess)),
            None => {
                warn!(node = %info.name, dep = %dep_name, "dependency missing from nodes map");
                false
            }
        })
    }
}
