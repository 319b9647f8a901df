// src/dag/node_info.rs

//! Per-node run state and the dispatch record handed to executors.

use crate::adapters::Invocation;
use crate::engine::NodeName;

/// Per-run state of a node (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on dependencies.
    Pending,
    /// Dependencies succeeded; waiting for a free processor slot.
    Ready,
    /// Dispatched to the executor.
    Running,
    DoneSuccess,
    DoneFailed,
    /// Never started, because an upstream node failed or the run was halted.
    Skipped,
}

/// Public, read-only view of a node's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRunState {
    /// No run has been started yet.
    NotInRun,
    Pending,
    Ready,
    Running,
    DoneSuccess,
    DoneFailed,
    Skipped,
}

impl NodeRunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeRunState::DoneSuccess | NodeRunState::DoneFailed | NodeRunState::Skipped
        )
    }
}

impl From<Option<RunState>> for NodeRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => NodeRunState::NotInRun,
            Some(RunState::Pending) => NodeRunState::Pending,
            Some(RunState::Ready) => NodeRunState::Ready,
            Some(RunState::Running) => NodeRunState::Running,
            Some(RunState::DoneSuccess) => NodeRunState::DoneSuccess,
            Some(RunState::DoneFailed) => NodeRunState::DoneFailed,
            Some(RunState::Skipped) => NodeRunState::Skipped,
        }
    }
}

/// Static node information plus per-run state.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: NodeName,
    /// Direct dependencies of this node.
    pub deps: Vec<NodeName>,
    pub run_state: Option<RunState>,
}

impl NodeInfo {
    pub fn new(name: NodeName, deps: Vec<NodeName>) -> Self {
        Self {
            name,
            deps,
            run_state: None,
        }
    }
}

/// A node the core wants the executor to run now, with its fully resolved
/// invocation.
#[derive(Debug, Clone)]
pub struct ScheduledNode {
    pub name: NodeName,
    pub invocation: Invocation,
}
