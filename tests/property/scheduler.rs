use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;

use petbrainprep::dag::{GraphBuilder, InputBinding, NodeHandle, NodeRunState, PipelineGraph};
use petbrainprep::engine::{CoreCommand, CoreRuntime, CoreStep, RuntimeEvent, RuntimeOptions};
use petbrainprep::errors::{FailureReason, ToolFailure};
use petbrainprep_test_utils::stub_adapter::{stub_slot, StubTool, STUB_INPUTS};

// Acyclic by construction: node i may only depend on nodes 0..i.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_nodes).prop_flat_map(|num_nodes| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..STUB_INPUTS),
            num_nodes,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, picks)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        picks.into_iter().map(|p| p % i).collect()
                    }
                })
                .collect()
        })
    })
}

fn node_name(i: usize) -> String {
    format!("node_{i}")
}

fn build_graph(deps: &[BTreeSet<usize>]) -> Arc<PipelineGraph> {
    let mut b = GraphBuilder::new();
    let mut handles: Vec<NodeHandle> = Vec::with_capacity(deps.len());
    for (i, node_deps) in deps.iter().enumerate() {
        let bindings: Vec<(&str, InputBinding)> = node_deps
            .iter()
            .enumerate()
            .map(|(slot, &dep)| (stub_slot(slot), InputBinding::from(handles[dep].output("out"))))
            .collect();
        let handle = b
            .add_node(&node_name(i), Arc::new(StubTool), bindings)
            .unwrap();
        handles.push(handle);
    }
    Arc::new(b.build().unwrap())
}

fn options(max_parallel: usize) -> RuntimeOptions {
    RuntimeOptions {
        max_parallel,
        node_root: PathBuf::from("/work"),
    }
}

fn dispatched(step: &CoreStep) -> Vec<(String, BTreeMap<String, PathBuf>)> {
    step.commands
        .iter()
        .flat_map(|c| match c {
            CoreCommand::DispatchNodes(nodes) => nodes
                .iter()
                .map(|n| (n.name.clone(), n.invocation.outputs.clone()))
                .collect(),
            CoreCommand::RequestExit => Vec::new(),
        })
        .collect()
}

proptest! {
    #[test]
    fn scheduler_respects_order_budget_and_terminates(
        deps in dag_strategy(12),
        budget in 1..4usize,
        failing_picks in proptest::collection::vec(0..12usize, 0..3),
        completion_picks in proptest::collection::vec(any::<usize>(), 64),
    ) {
        let graph = build_graph(&deps);
        let failing: HashSet<String> = failing_picks
            .iter()
            .filter(|&&i| i < deps.len())
            .map(|&i| node_name(i))
            .collect();

        let mut core = CoreRuntime::new(Arc::clone(&graph), options(budget));
        let mut running: Vec<(String, BTreeMap<String, PathBuf>)> = Vec::new();
        let mut ever_dispatched: Vec<String> = Vec::new();

        let mut step = core.start();
        let mut picks = completion_picks.iter().cycle();

        loop {
            for (name, outputs) in dispatched(&step) {
                // A node only starts once every producer succeeded.
                for dep in graph.dependencies_of(&name) {
                    prop_assert_eq!(
                        core.scheduler().run_state_of(dep),
                        Some(NodeRunState::DoneSuccess)
                    );
                }
                prop_assert!(!ever_dispatched.contains(&name), "{} dispatched twice", name);
                ever_dispatched.push(name.clone());
                running.push((name, outputs));
            }
            prop_assert!(core.running_count() <= budget);
            prop_assert_eq!(core.running_count(), running.len());

            if !step.keep_running {
                break;
            }
            prop_assert!(!running.is_empty(), "runtime waiting with nothing running");

            let idx = picks.next().copied().unwrap_or(0) % running.len();
            let (name, outputs) = running.remove(idx);
            let result = if failing.contains(&name) {
                Err(ToolFailure::new("stub", "stub", FailureReason::NonZeroExit(1)))
            } else {
                Ok(outputs)
            };
            step = core.step(RuntimeEvent::NodeCompleted { node: name, result });
        }

        prop_assert!(core.is_finished());
        let failed: Vec<&String> = ever_dispatched
            .iter()
            .filter(|n| failing.contains(*n))
            .collect();
        for name in graph.node_names() {
            let state = core.scheduler().run_state_of(name).unwrap();
            prop_assert!(state.is_terminal(), "{} ended in {:?}", name, state);
            // Only nodes downstream of a failure are skipped.
            if state == NodeRunState::Skipped {
                prop_assert!(
                    failed.iter().any(|f| graph.transitive_dependents(f).contains(name)),
                    "{} skipped without a failed ancestor",
                    name
                );
            }
        }

        let any_failed = ever_dispatched.iter().any(|n| failing.contains(n));
        if !any_failed {
            prop_assert_eq!(ever_dispatched.len(), graph.len());
            prop_assert!(core.into_report().is_ok());
        } else {
            prop_assert!(core.into_report().is_err());
        }
    }
}
