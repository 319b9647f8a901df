// src/engine/artifacts.rs

//! Outputs of completed nodes, and resolution of input bindings against them.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::adapters::{ResolvedInputs, ResolvedValue};
use crate::dag::{GraphNode, InputBinding, OutputRef, PipelineGraph, TransformSource};
use crate::engine::NodeName;

#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    outputs: HashMap<NodeName, BTreeMap<String, PathBuf>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: &str, outputs: BTreeMap<String, PathBuf>) {
        self.outputs.insert(node.to_string(), outputs);
    }

    pub fn get(&self, r: &OutputRef) -> Option<&Path> {
        self.outputs
            .get(&r.node)
            .and_then(|slots| slots.get(&r.slot))
            .map(PathBuf::as_path)
    }

    pub fn resolve(&self, r: &OutputRef) -> Result<&Path> {
        self.get(r)
            .ok_or_else(|| anyhow!("output {r} has not been produced"))
    }

    pub fn resolve_binding(&self, binding: &InputBinding) -> Result<ResolvedValue> {
        Ok(match binding {
            InputBinding::Path(path) => ResolvedValue::File(path.clone()),
            InputBinding::Output(r) => ResolvedValue::File(self.resolve(r)?.to_path_buf()),
            InputBinding::Chain(chain) => {
                let mut list = Vec::with_capacity(chain.len());
                for (source, invert) in chain.entries() {
                    let path = match source {
                        TransformSource::File(path) => path.clone(),
                        TransformSource::Output(r) => self.resolve(r)?.to_path_buf(),
                    };
                    list.push((path, *invert));
                }
                ResolvedValue::Transforms(list)
            }
        })
    }

    /// Resolve every bound input slot of a node.
    pub fn resolve_inputs(&self, node: &GraphNode) -> Result<ResolvedInputs> {
        let mut inputs = ResolvedInputs::new();
        for (slot, binding) in &node.bindings {
            inputs.insert(slot.clone(), self.resolve_binding(binding)?);
        }
        Ok(inputs)
    }

    /// The graph's declared terminal outputs, by name.
    pub fn terminal_outputs(&self, graph: &PipelineGraph) -> Result<BTreeMap<String, PathBuf>> {
        graph
            .terminal_outputs()
            .iter()
            .map(|(name, r)| Ok((name.clone(), self.resolve(r)?.to_path_buf())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::TransformChain;

    #[test]
    fn resolves_chain_mixing_files_and_outputs() {
        let mut store = ArtifactStore::new();
        store.record(
            "coreg",
            BTreeMap::from([(
                "composite_transform".to_string(),
                PathBuf::from("/w/coreg/xfmComposite.h5"),
            )]),
        );

        let chain = TransformChain::new(
            vec![
                TransformSource::File(PathBuf::from("/anat/to_mni.h5")),
                TransformSource::Output(OutputRef::new("coreg", "composite_transform")),
            ],
            vec![false, true],
        )
        .unwrap();

        let value = store.resolve_binding(&InputBinding::Chain(chain)).unwrap();
        assert_eq!(
            value,
            ResolvedValue::Transforms(vec![
                (PathBuf::from("/anat/to_mni.h5"), false),
                (PathBuf::from("/w/coreg/xfmComposite.h5"), true),
            ])
        );
    }

    #[test]
    fn unresolved_output_is_an_error() {
        let store = ArtifactStore::new();
        let err = store
            .resolve_binding(&InputBinding::Output(OutputRef::new("crop", "out_file")))
            .unwrap_err();
        assert!(err.to_string().contains("crop.out_file"));
    }
}
