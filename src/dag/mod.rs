// src/dag/mod.rs

//! Pipeline graph representation and scheduling.
//!
//! - [`node`] defines graph nodes, output references and input bindings.
//! - [`chain`] holds ordered transform chains.
//! - [`builder`] validates nodes as they are declared and produces a
//!   [`PipelineGraph`].
//! - [`graph`] is the immutable, validated graph.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which nodes are ready to run, and what happens when one fails.
//! - [`node_info`] provides per-node run state and dispatched node types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod builder;
pub mod chain;
pub mod graph;
pub mod node;
pub mod node_info;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;

pub use builder::{GraphBuilder, NodeHandle};
pub use chain::{TransformChain, TransformSource};
pub use graph::{PipelineGraph, SinkRoute};
pub use node::{GraphNode, InputBinding, OutputRef};
pub use node_info::{NodeRunState, ScheduledNode};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
