// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::dag::{NodeRunState, PipelineGraph, ScheduledNode, Scheduler};
use crate::engine::artifacts::ArtifactStore;
use crate::engine::{NodeName, NodeOutcome, RuntimeOptions};
use crate::errors::{FailureReason, NodeFailure, ToolFailure};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these nodes to the executor.
    DispatchNodes(Vec<ScheduledNode>),
    /// Every node is terminal; the shell can stop reading events.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Mutable bookkeeping of one run, next to the scheduler's node states.
#[derive(Debug, Default)]
pub struct RunProgress {
    pub artifacts: ArtifactStore,
    /// `Ready` nodes waiting for a processor slot, in the order they became
    /// ready.
    pub ready: VecDeque<NodeName>,
    pub running: BTreeSet<NodeName>,
    pub failures: Vec<NodeFailure>,
    pub interrupted: bool,
}

/// Start the run and dispatch the roots, up to the budget.
pub fn handle_start(
    graph: &PipelineGraph,
    scheduler: &mut Scheduler,
    run: &mut RunProgress,
    options: &RuntimeOptions,
) -> CoreStep {
    let step = scheduler.start_run();
    run.ready.extend(step.newly_ready);
    finish_step(graph, scheduler, run, options)
}

/// Handle a node completion event.
pub fn handle_node_completion(
    graph: &PipelineGraph,
    scheduler: &mut Scheduler,
    run: &mut RunProgress,
    options: &RuntimeOptions,
    node: NodeName,
    result: Result<BTreeMap<String, PathBuf>, ToolFailure>,
) -> CoreStep {
    if !run.running.remove(&node) {
        warn!(node = %node, "completion for a node that is not running; ignoring");
        return finish_step(graph, scheduler, run, options);
    }

    match result {
        Ok(outputs) => {
            info!(node = %node, outputs = outputs.len(), "node succeeded");
            run.artifacts.record(&node, outputs);
            let newly_ready = scheduler.handle_completion(&node, NodeOutcome::Success);
            run.ready.extend(newly_ready);
        }
        Err(failure) => {
            error!(node = %node, error = %failure, "node failed");
            run.failures.push(NodeFailure { node: node.clone(), failure });
            fail_node(scheduler, run, &node);
        }
    }

    finish_step(graph, scheduler, run, options)
}

/// Handle a shutdown request: nothing new is dispatched, running nodes are
/// left to finish.
pub fn handle_shutdown(
    graph: &PipelineGraph,
    scheduler: &mut Scheduler,
    run: &mut RunProgress,
    options: &RuntimeOptions,
) -> CoreStep {
    info!(running = run.running.len(), "shutdown requested; waiting for running nodes");
    run.interrupted = true;
    run.ready.clear();
    scheduler.halt();
    finish_step(graph, scheduler, run, options)
}

/// Dispatch what the budget allows and decide whether the loop continues.
fn finish_step(
    graph: &PipelineGraph,
    scheduler: &mut Scheduler,
    run: &mut RunProgress,
    options: &RuntimeOptions,
) -> CoreStep {
    let mut commands = Vec::new();

    let dispatched = fill_free_slots(graph, scheduler, run, options);
    if !dispatched.is_empty() {
        commands.push(CoreCommand::DispatchNodes(dispatched));
    }

    let finished = scheduler.is_idle() && run.running.is_empty();
    if finished {
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running: !finished,
    }
}

/// Pop ready nodes while processor slots are free, resolving each node's
/// inputs against the artifact store.
///
/// A node whose invocation cannot be built fails on the spot, without ever
/// reaching the executor.
fn fill_free_slots(
    graph: &PipelineGraph,
    scheduler: &mut Scheduler,
    run: &mut RunProgress,
    options: &RuntimeOptions,
) -> Vec<ScheduledNode> {
    let mut dispatched = Vec::new();
    let budget = options.max_parallel.max(1);

    while run.running.len() < budget {
        let Some(name) = run.ready.pop_front() else {
            break;
        };
        if scheduler.run_state_of(&name) != Some(NodeRunState::Ready) {
            continue;
        }
        let Some(node) = graph.node(&name) else {
            warn!(node = %name, "ready node missing from graph; ignoring");
            continue;
        };

        let node_dir = options.node_root.join(&name);
        let built = run
            .artifacts
            .resolve_inputs(node)
            .and_then(|inputs| node.adapter.invocation(&inputs, &node_dir));
        scheduler.mark_dispatched(&name);

        match built {
            Ok(invocation) => {
                debug!(node = %name, cmd = %invocation.command_line(), "dispatching node");
                run.running.insert(name.clone());
                dispatched.push(ScheduledNode { name, invocation });
            }
            Err(err) => {
                let failure = ToolFailure::new(
                    node.adapter.program(),
                    String::new(),
                    FailureReason::Invocation(format!("{err:#}")),
                );
                error!(node = %name, error = %failure, "could not prepare node");
                run.failures.push(NodeFailure {
                    node: name.clone(),
                    failure,
                });
                fail_node(scheduler, run, &name);
            }
        }
    }

    dispatched
}

fn fail_node(scheduler: &mut Scheduler, run: &mut RunProgress, node: &str) {
    let step = scheduler.step_completion(node, NodeOutcome::Failed);
    if !step.newly_skipped.is_empty() {
        warn!(node = %node, skipped = ?step.newly_skipped, "dependents skipped after failure");
    }
    run.ready.retain(|n| !step.newly_skipped.contains(n));
}
