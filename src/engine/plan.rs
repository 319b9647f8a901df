// src/engine/plan.rs

//! Dry-run planning: every node's invocation, computed from the outputs its
//! upstream nodes would produce, without running anything.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::adapters::Invocation;
use crate::dag::PipelineGraph;
use crate::engine::artifacts::ArtifactStore;
use crate::engine::NodeName;
use crate::errors::Result;

#[derive(Debug, Clone)]
pub struct PlannedNode {
    pub name: NodeName,
    pub invocation: Invocation,
}

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Nodes in a valid execution order.
    pub nodes: Vec<PlannedNode>,
    /// Terminal output name -> path the run would produce.
    pub outputs: BTreeMap<String, PathBuf>,
}

/// Plan every node of `graph`, with node directories under `node_root`.
pub fn plan(graph: &PipelineGraph, node_root: &Path) -> Result<ExecutionPlan> {
    let mut store = ArtifactStore::new();
    let mut nodes = Vec::with_capacity(graph.len());

    for node in graph.nodes() {
        let inputs = store
            .resolve_inputs(node)
            .with_context(|| format!("resolving inputs of node '{}'", node.name))?;
        let invocation = node
            .adapter
            .invocation(&inputs, &node_root.join(&node.name))
            .with_context(|| format!("building invocation of node '{}'", node.name))?;

        store.record(&node.name, invocation.outputs.clone());
        nodes.push(PlannedNode {
            name: node.name.clone(),
            invocation,
        });
    }

    let outputs = store.terminal_outputs(graph)?;
    Ok(ExecutionPlan { nodes, outputs })
}
