// src/dag/builder.rs

//! Incremental, validating construction of a [`PipelineGraph`].
//!
//! Nodes must be added leaves first: a binding may only reference nodes that
//! already exist, and only output slots their adapters declare. Every check
//! happens in [`GraphBuilder::add_node`], so a wiring mistake is reported at
//! the line that introduced it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::adapters::{SlotKind, ToolAdapter};
use crate::dag::graph::{PipelineGraph, SinkRoute};
use crate::dag::node::{GraphNode, InputBinding, OutputRef};
use crate::engine::NodeName;
use crate::errors::GraphError;
use crate::sink::SinkCategory;

/// Handle to a node that has been added to a [`GraphBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    name: NodeName,
}

impl NodeHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference one of this node's output slots.
    ///
    /// The slot is checked when the reference is bound to another node.
    pub fn output(&self, slot: &str) -> OutputRef {
        OutputRef::new(self.name.clone(), slot)
    }
}

#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeName, usize>,
    terminals: BTreeMap<String, OutputRef>,
    sink_routes: Vec<SinkRoute>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node with its input bindings.
    pub fn add_node<I, S>(
        &mut self,
        name: &str,
        adapter: Arc<dyn ToolAdapter>,
        bindings: I,
    ) -> Result<NodeHandle, GraphError>
    where
        I: IntoIterator<Item = (S, InputBinding)>,
        S: Into<String>,
    {
        if self.index.contains_key(name) {
            return Err(GraphError::DuplicateNode(name.to_string()));
        }

        let mut bound: BTreeMap<String, InputBinding> = BTreeMap::new();
        for (slot, binding) in bindings {
            let slot = slot.into();
            let Some(decl) = adapter.input_slot(&slot) else {
                return Err(GraphError::UnknownInputSlot {
                    node: name.to_string(),
                    adapter: adapter.program().to_string(),
                    slot,
                });
            };

            match (decl.kind, &binding) {
                (SlotKind::Transforms, InputBinding::Chain(_)) => {}
                (SlotKind::File, InputBinding::Path(_) | InputBinding::Output(_)) => {}
                (SlotKind::Transforms, _) => {
                    return Err(GraphError::BindingKind {
                        node: name.to_string(),
                        slot,
                        expected: "transform chain",
                    });
                }
                (SlotKind::File, InputBinding::Chain(_)) => {
                    return Err(GraphError::BindingKind {
                        node: name.to_string(),
                        slot,
                        expected: "file",
                    });
                }
            }

            for r in binding.output_refs() {
                self.check_output_ref(name, r)?;
            }

            bound.insert(slot, binding);
        }

        for decl in adapter.input_slots() {
            if decl.required && !bound.contains_key(decl.name) {
                return Err(GraphError::MissingBinding {
                    node: name.to_string(),
                    slot: decl.name.to_string(),
                });
            }
        }

        debug!(node = %name, program = adapter.program(), "graph node added");

        self.index.insert(name.to_string(), self.nodes.len());
        self.nodes.push(GraphNode {
            name: name.to_string(),
            adapter,
            bindings: bound,
        });

        Ok(NodeHandle {
            name: name.to_string(),
        })
    }

    /// Declare a named graph output, returned by the runtime after a
    /// successful run.
    pub fn terminal(&mut self, name: &str, output: OutputRef) -> Result<(), GraphError> {
        self.check_output_ref(name, &output)?;
        if self.terminals.contains_key(name) {
            return Err(GraphError::DuplicateOutput(name.to_string()));
        }
        self.terminals.insert(name.to_string(), output);
        Ok(())
    }

    /// Route a node output to a category of the participant's results tree.
    pub fn sink(&mut self, output: OutputRef, category: SinkCategory) -> Result<(), GraphError> {
        self.check_output_ref("sink", &output)?;
        self.sink_routes.push(SinkRoute { output, category });
        Ok(())
    }

    /// Check for cycles and freeze the graph.
    pub fn build(self) -> Result<PipelineGraph, GraphError> {
        // Edge direction: producer -> consumer.
        let mut g: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in &self.nodes {
            g.add_node(node.name.as_str());
        }
        for node in &self.nodes {
            for r in node.bindings.values().flat_map(|b| b.output_refs()) {
                g.add_edge(r.node.as_str(), node.name.as_str(), ());
            }
        }

        if let Err(cycle) = toposort(&g, None) {
            return Err(GraphError::Cycle(cycle.node_id().to_string()));
        }

        Ok(PipelineGraph::new(self.nodes, self.terminals, self.sink_routes))
    }

    fn check_output_ref(&self, referrer: &str, r: &OutputRef) -> Result<(), GraphError> {
        let Some(&idx) = self.index.get(&r.node) else {
            return Err(GraphError::UnknownNode {
                node: referrer.to_string(),
                target: r.node.clone(),
            });
        };
        if !self.nodes[idx].adapter.has_output(&r.slot) {
            return Err(GraphError::UnknownOutputSlot {
                node: referrer.to_string(),
                target: r.node.clone(),
                slot: r.slot.clone(),
            });
        }
        Ok(())
    }
}
