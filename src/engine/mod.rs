// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the graph scheduler
//! - the artifact store that resolves node outputs for downstream inputs
//! - the main runtime event loop that reacts to:
//!   - node completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. [`plan`] walks the same graph without running
//! anything, for dry runs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::errors::ToolFailure;

/// Canonical node name type used throughout the engine.
pub type NodeName = String;

/// Outcome of a node for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    Success,
    Failed,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Maximum number of nodes running at once.
    pub max_parallel: usize,
    /// Parent of the per-node working directories.
    pub node_root: PathBuf,
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A node's process finished. On success, carries the node's declared
    /// outputs, all of which exist.
    NodeCompleted {
        node: NodeName,
        result: Result<BTreeMap<String, PathBuf>, ToolFailure>,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod artifacts;
pub mod core;
pub mod event_handlers;
pub mod plan;
pub mod runtime;

pub use artifacts::ArtifactStore;
pub use self::core::{CoreRuntime, RunReport};
pub use event_handlers::{CoreCommand, CoreStep};
pub use plan::{plan, ExecutionPlan, PlannedNode};
pub use runtime::Runtime;
