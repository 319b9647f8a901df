// src/dag/scheduler.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::PipelineGraph;
use crate::dag::node_info::{NodeInfo, NodeRunState, RunState};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::engine::{NodeName, NodeOutcome};

/// Scheduler holds the immutable graph plus mutable per-run state.
///
/// It is responsible for:
/// - deciding when a node is ready to run (all producers succeeded)
/// - recording node success and failure
/// - fail-fast: skipping the transitive dependents of a failed node, while
///   independent branches keep running
/// - halting: skipping every node that has not started yet
///
/// It does not know about processor budgets; the core runtime decides how
/// many `Ready` nodes are dispatched at once.
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<PipelineGraph>,
    nodes: HashMap<NodeName, NodeInfo>,
    active: bool,
}

impl Scheduler {
    pub fn new(graph: Arc<PipelineGraph>) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|n| {
                let deps = graph.dependencies_of(&n.name).to_vec();
                (n.name.clone(), NodeInfo::new(n.name.clone(), deps))
            })
            .collect();

        Self {
            graph,
            nodes,
            active: false,
        }
    }

    /// Returns `true` if no run is in progress.
    pub fn is_idle(&self) -> bool {
        !self.active
    }

    /// Read-only view of the given node's run state.
    pub fn run_state_of(&self, node: &str) -> Option<NodeRunState> {
        let info = self.nodes.get(node)?;
        Some(info.run_state.into())
    }

    /// Start the run: every node becomes `Pending` and the roots `Ready`.
    pub fn start_run(&mut self) -> SchedulerStep {
        self.active = true;
        info!(nodes = self.nodes.len(), "scheduler: starting pipeline run");

        let mut manager = StateManager::new(&self.graph, &mut self.nodes);
        manager.mark_all_pending();
        let newly_ready = manager.collect_new_ready_nodes();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_ready,
            run_just_finished,
            ..SchedulerStep::default()
        }
    }

    /// Record that a `Ready` node was handed to the executor.
    ///
    /// Returns `false` (and changes nothing) if the node was not `Ready`.
    pub fn mark_dispatched(&mut self, node: &str) -> bool {
        match self.nodes.get_mut(node) {
            Some(info) if info.run_state == Some(RunState::Ready) => {
                info.run_state = Some(RunState::Running);
                debug!(node = %node, "node dispatched; marking Running");
                true
            }
            Some(info) => {
                warn!(
                    node = %node,
                    state = ?info.run_state,
                    "dispatch of node that is not ready; ignoring"
                );
                false
            }
            None => {
                warn!(node = %node, "dispatch of unknown node; ignoring");
                false
            }
        }
    }

    /// Handle completion of a node (production API).
    pub fn handle_completion(&mut self, node: &str, outcome: NodeOutcome) -> Vec<NodeName> {
        self.step_completion(node, outcome).newly_ready
    }

    /// Manual-step variant of `handle_completion` that returns a rich
    /// [`SchedulerStep`].
    pub fn step_completion(&mut self, node: &str, outcome: NodeOutcome) -> SchedulerStep {
        if !self.active {
            warn!(node = %node, "completion with no active run; ignoring");
            return SchedulerStep::default();
        }

        let mut step = SchedulerStep::default();

        match self.nodes.get_mut(node) {
            Some(info) if info.run_state == Some(RunState::Running) => match outcome {
                NodeOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    debug!(node = %node, "node completed successfully");
                    let mut manager = StateManager::new(&self.graph, &mut self.nodes);
                    step.newly_ready = manager.collect_new_ready_nodes();
                }
                NodeOutcome::Failed => {
                    info.run_state = Some(RunState::DoneFailed);
                    warn!(node = %node, "node failed; skipping dependents");
                    step.newly_failed.push(node.to_string());
                    let mut manager = StateManager::new(&self.graph, &mut self.nodes);
                    step.newly_skipped = manager.mark_dependents_skipped(node);
                }
            },
            Some(info) => {
                warn!(
                    node = %node,
                    state = ?info.run_state,
                    "completion for node that is not running; ignoring"
                );
            }
            None => {
                warn!(node = %node, "completion for unknown node; ignoring");
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Stop starting new nodes. Running nodes are left to finish.
    pub fn halt(&mut self) -> Vec<NodeName> {
        if !self.active {
            return Vec::new();
        }
        let mut manager = StateManager::new(&self.graph, &mut self.nodes);
        let skipped = manager.skip_unstarted();
        if !skipped.is_empty() {
            info!(skipped = skipped.len(), "scheduler: halted; unstarted nodes skipped");
        }
        self.maybe_finish_run();
        skipped
    }

    /// Clear the active flag once every node is terminal.
    ///
    /// Returns `true` if this call finished the run.
    fn maybe_finish_run(&mut self) -> bool {
        if !self.active {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.nodes);
        if manager.all_nodes_terminal() {
            info!("scheduler: all nodes terminal; run finished");
            self.active = false;
            true
        } else {
            false
        }
    }
}
