// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::engine::NodeName;

/// Structured result of a single scheduler "step".
///
/// Useful for tests that want to manually step the graph and make
/// assertions about what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Nodes whose dependencies became satisfied in this step.
    pub newly_ready: Vec<NodeName>,
    /// Nodes that failed in this step.
    pub newly_failed: Vec<NodeName>,
    /// Nodes that will never run: dependents of a failed node, and every
    /// other node that had not started when the run was halted.
    pub newly_skipped: Vec<NodeName>,
    /// Whether this step finished the run (every node terminal).
    pub run_just_finished: bool,
}
