// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from channels and sending `ScheduledNode`s to the executor.
//!
//! The core holds the processor budget: it never has more than
//! `max_parallel` nodes out at once. It is unit tested without any Tokio,
//! channels, filesystem, or processes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::dag::{PipelineGraph, Scheduler};
use crate::engine::artifacts::ArtifactStore;
use crate::engine::event_handlers::{
    handle_node_completion, handle_shutdown, handle_start, CoreStep, RunProgress,
};
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::errors::{PipelineError, Result};

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Declared outputs of every node.
    pub artifacts: ArtifactStore,
    /// Terminal output name -> path.
    pub outputs: BTreeMap<String, PathBuf>,
}

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    graph: Arc<PipelineGraph>,
    scheduler: Scheduler,
    run: RunProgress,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(graph: Arc<PipelineGraph>, options: RuntimeOptions) -> Self {
        let scheduler = Scheduler::new(Arc::clone(&graph));
        Self {
            graph,
            scheduler,
            run: RunProgress::default(),
            options,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.run.artifacts
    }

    pub fn running_count(&self) -> usize {
        self.run.running.len()
    }

    /// True once no node is running and none will start.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_idle() && self.run.running.is_empty()
    }

    /// Begin the run; returns the first dispatches.
    pub fn start(&mut self) -> CoreStep {
        handle_start(&self.graph, &mut self.scheduler, &mut self.run, &self.options)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::NodeCompleted { node, result } => handle_node_completion(
                &self.graph,
                &mut self.scheduler,
                &mut self.run,
                &self.options,
                node,
                result,
            ),
            RuntimeEvent::ShutdownRequested => {
                handle_shutdown(&self.graph, &mut self.scheduler, &mut self.run, &self.options)
            }
        }
    }

    /// Turn the final state into the run's result.
    ///
    /// Failures take precedence over an interruption.
    pub fn into_report(self) -> Result<RunReport> {
        if !self.run.failures.is_empty() {
            return Err(PipelineError::NodesFailed(self.run.failures));
        }
        if self.run.interrupted || !self.is_finished() {
            return Err(PipelineError::Interrupted);
        }
        let outputs = self.run.artifacts.terminal_outputs(&self.graph)?;
        Ok(RunReport {
            artifacts: self.run.artifacts,
            outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::adapters::{Autobox, ToolAdapter};
    use crate::config::CropConfig;
    use crate::dag::{GraphBuilder, InputBinding, NodeRunState, OutputRef};
    use crate::engine::CoreCommand;
    use crate::errors::{FailureReason, ToolFailure};
    use crate::types::OutputType;

    fn crop() -> Arc<dyn ToolAdapter> {
        Arc::new(Autobox::from_config(&CropConfig::default(), OutputType::NiftiGz))
    }

    /// a -> b, plus an independent c.
    fn graph() -> Arc<PipelineGraph> {
        let mut b = GraphBuilder::new();
        let a = b
            .add_node("a", crop(), [("in_file", InputBinding::Path("/in/a.nii.gz".into()))])
            .unwrap();
        b.add_node("b", crop(), [("in_file", InputBinding::from(a.output("out_file")))])
            .unwrap();
        b.add_node("c", crop(), [("in_file", InputBinding::Path("/in/c.nii.gz".into()))])
            .unwrap();
        b.terminal("final", OutputRef::new("b", "out_file")).unwrap();
        Arc::new(b.build().unwrap())
    }

    fn options(max_parallel: usize) -> RuntimeOptions {
        RuntimeOptions {
            max_parallel,
            node_root: "/work".into(),
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .flat_map(|c| match c {
                CoreCommand::DispatchNodes(nodes) => nodes.iter().map(|n| n.name.clone()).collect(),
                CoreCommand::RequestExit => Vec::new(),
            })
            .collect()
    }

    fn success(node: &str) -> RuntimeEvent {
        RuntimeEvent::NodeCompleted {
            node: node.to_string(),
            result: Ok(BTreeMap::from([(
                "out_file".to_string(),
                Path::new("/work").join(node).join("out.nii.gz"),
            )])),
        }
    }

    #[test]
    fn budget_of_one_serialises_roots() {
        let mut core = CoreRuntime::new(graph(), options(1));
        let step = core.start();
        assert_eq!(dispatched(&step), vec!["a"]);
        assert_eq!(core.running_count(), 1);

        let step = core.step(success("a"));
        assert_eq!(dispatched(&step), vec!["c"]);

        let step = core.step(success("c"));
        assert_eq!(dispatched(&step), vec!["b"]);

        let step = core.step(success("b"));
        assert!(!step.keep_running);

        let report = core.into_report().unwrap();
        assert_eq!(
            report.outputs["final"],
            Path::new("/work/b/out.nii.gz").to_path_buf()
        );
    }

    #[test]
    fn downstream_inputs_resolve_to_upstream_outputs() {
        let mut core = CoreRuntime::new(graph(), options(4));
        core.start();
        let step = core.step(success("a"));
        let b = step
            .commands
            .iter()
            .find_map(|c| match c {
                CoreCommand::DispatchNodes(nodes) => nodes.iter().find(|n| n.name == "b").cloned(),
                _ => None,
            })
            .unwrap();
        assert_eq!(b.invocation.args[1], "/work/a/out.nii.gz");
        assert_eq!(b.invocation.working_dir, Path::new("/work/b"));
    }

    #[test]
    fn failure_skips_dependents_and_lets_running_nodes_finish() {
        let mut core = CoreRuntime::new(graph(), options(4));
        let step = core.start();
        assert_eq!(dispatched(&step), vec!["a", "c"]);

        let failure = ToolFailure::new("3dAutobox", "3dAutobox", FailureReason::NonZeroExit(1));
        let step = core.step(RuntimeEvent::NodeCompleted {
            node: "a".into(),
            result: Err(failure),
        });
        assert!(dispatched(&step).is_empty());
        assert!(step.keep_running, "c is still running");
        assert_eq!(core.scheduler().run_state_of("b"), Some(NodeRunState::Skipped));

        let step = core.step(success("c"));
        assert!(!step.keep_running);
        assert_eq!(core.scheduler().run_state_of("c"), Some(NodeRunState::DoneSuccess));

        match core.into_report() {
            Err(PipelineError::NodesFailed(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].node, "a");
            }
            other => panic!("expected NodesFailed, got {other:?}"),
        }
    }

    #[test]
    fn failure_keeps_independent_branch_running() {
        let mut core = CoreRuntime::new(graph(), options(1));
        let step = core.start();
        assert_eq!(dispatched(&step), vec!["a"]);

        let failure = ToolFailure::new("3dAutobox", "3dAutobox", FailureReason::NonZeroExit(1));
        let step = core.step(RuntimeEvent::NodeCompleted {
            node: "a".into(),
            result: Err(failure),
        });
        assert_eq!(dispatched(&step), vec!["c"]);
        assert_eq!(core.scheduler().run_state_of("b"), Some(NodeRunState::Skipped));

        let step = core.step(success("c"));
        assert!(!step.keep_running);
        assert_eq!(core.scheduler().run_state_of("c"), Some(NodeRunState::DoneSuccess));
        assert!(matches!(core.into_report(), Err(PipelineError::NodesFailed(_))));
    }

    #[test]
    fn shutdown_stops_dispatch_and_reports_interruption() {
        let mut core = CoreRuntime::new(graph(), options(1));
        core.start();
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(step.keep_running, "a is still running");

        let step = core.step(success("a"));
        assert!(dispatched(&step).is_empty());
        assert!(!step.keep_running);
        assert!(matches!(core.into_report(), Err(PipelineError::Interrupted)));
    }
}
