// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::dot::Dot;
use petgraph::graph::DiGraph;

use crate::dag::node::{GraphNode, OutputRef};
use crate::engine::NodeName;
use crate::sink::SinkCategory;

/// A node output that the artifact sink copies into the results tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkRoute {
    pub output: OutputRef,
    pub category: SinkCategory,
}

/// Adjacency of one node.
#[derive(Debug, Clone, Default)]
struct Adjacency {
    /// Direct dependencies: nodes whose outputs this one consumes.
    deps: Vec<NodeName>,
    /// Direct dependents: nodes that consume this one's outputs.
    dependents: Vec<NodeName>,
}

/// Immutable, validated pipeline graph.
///
/// Built by [`crate::dag::GraphBuilder`], which has already checked every
/// reference and ruled out cycles, so this only stores nodes in insertion
/// order plus adjacency information for scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeName, usize>,
    adjacency: HashMap<NodeName, Adjacency>,
    terminals: BTreeMap<String, OutputRef>,
    sink_routes: Vec<SinkRoute>,
}

impl PipelineGraph {
    pub(crate) fn new(
        nodes: Vec<GraphNode>,
        terminals: BTreeMap<String, OutputRef>,
        sink_routes: Vec<SinkRoute>,
    ) -> Self {
        let mut index = HashMap::new();
        let mut adjacency: HashMap<NodeName, Adjacency> = HashMap::new();

        // First pass: dependency lists.
        for (i, node) in nodes.iter().enumerate() {
            index.insert(node.name.clone(), i);
            adjacency.insert(
                node.name.clone(),
                Adjacency {
                    deps: node.upstream().into_iter().collect(),
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: dependents, kept sorted.
        let mut dependents: HashMap<NodeName, BTreeSet<NodeName>> = HashMap::new();
        for node in &nodes {
            for dep in node.upstream() {
                dependents.entry(dep).or_default().insert(node.name.clone());
            }
        }
        for (name, set) in dependents {
            if let Some(adj) = adjacency.get_mut(&name) {
                adj.dependents = set.into_iter().collect();
            }
        }

        Self {
            nodes,
            index,
            adjacency,
            terminals,
            sink_routes,
        }
    }

    /// Nodes in insertion order, which is a topological order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate dependencies of a node.
    pub fn dependencies_of(&self, name: &str) -> &[NodeName] {
        self.adjacency
            .get(name)
            .map(|a| a.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a node.
    pub fn dependents_of(&self, name: &str) -> &[NodeName] {
        self.adjacency
            .get(name)
            .map(|a| a.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes without dependencies, in insertion order.
    pub fn roots(&self) -> Vec<NodeName> {
        self.nodes
            .iter()
            .filter(|n| self.dependencies_of(&n.name).is_empty())
            .map(|n| n.name.clone())
            .collect()
    }

    /// Every node reachable downstream of `name`, excluding `name` itself.
    pub fn transitive_dependents(&self, name: &str) -> BTreeSet<NodeName> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self.dependents_of(name).iter().map(|s| s.as_str()).collect();
        while let Some(n) = stack.pop() {
            if seen.insert(n.to_string()) {
                stack.extend(self.dependents_of(n).iter().map(|s| s.as_str()));
            }
        }
        seen
    }

    pub fn terminal_outputs(&self) -> &BTreeMap<String, OutputRef> {
        &self.terminals
    }

    pub fn sink_routes(&self) -> &[SinkRoute] {
        &self.sink_routes
    }

    /// Graphviz rendering: one vertex per node (labelled with its name and
    /// program), one edge per consumed output slot.
    pub fn to_dot(&self) -> String {
        let mut g: DiGraph<String, String> = DiGraph::new();
        let mut ids = HashMap::new();
        for node in &self.nodes {
            let id = g.add_node(format!("{} ({})", node.name, node.adapter.program()));
            ids.insert(node.name.as_str(), id);
        }
        for node in &self.nodes {
            for (slot, binding) in &node.bindings {
                for r in binding.output_refs() {
                    if let (Some(&from), Some(&to)) =
                        (ids.get(r.node.as_str()), ids.get(node.name.as_str()))
                    {
                        g.add_edge(from, to, format!("{} -> {}", r.slot, slot));
                    }
                }
            }
        }
        format!("{}", Dot::new(&g))
    }
}
