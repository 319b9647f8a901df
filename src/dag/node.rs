// src/dag/node.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::ToolAdapter;
use crate::dag::chain::{TransformChain, TransformSource};
use crate::engine::NodeName;

/// Reference to one output slot of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputRef {
    pub node: NodeName,
    pub slot: String,
}

impl OutputRef {
    pub fn new(node: impl Into<NodeName>, slot: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            slot: slot.into(),
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.slot)
    }
}

/// What feeds one input slot of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum InputBinding {
    /// A file that exists before the graph runs.
    Path(PathBuf),
    /// The output of another node.
    Output(OutputRef),
    /// An ordered transform chain.
    Chain(TransformChain),
}

impl InputBinding {
    /// Every node output this binding depends on.
    pub fn output_refs(&self) -> Vec<&OutputRef> {
        match self {
            InputBinding::Path(_) => Vec::new(),
            InputBinding::Output(r) => vec![r],
            InputBinding::Chain(chain) => chain
                .entries()
                .iter()
                .filter_map(|(source, _)| match source {
                    TransformSource::Output(r) => Some(r),
                    TransformSource::File(_) => None,
                })
                .collect(),
        }
    }
}

impl From<OutputRef> for InputBinding {
    fn from(r: OutputRef) -> Self {
        InputBinding::Output(r)
    }
}

impl From<PathBuf> for InputBinding {
    fn from(p: PathBuf) -> Self {
        InputBinding::Path(p)
    }
}

impl From<TransformChain> for InputBinding {
    fn from(c: TransformChain) -> Self {
        InputBinding::Chain(c)
    }
}

/// One adapter invocation in the pipeline graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub name: NodeName,
    pub adapter: Arc<dyn ToolAdapter>,
    /// Input slot name -> binding.
    pub bindings: BTreeMap<String, InputBinding>,
}

impl GraphNode {
    /// Names of the nodes whose outputs this node consumes.
    pub fn upstream(&self) -> BTreeSet<NodeName> {
        self.bindings
            .values()
            .flat_map(|b| b.output_refs())
            .map(|r| r.node.clone())
            .collect()
    }
}
