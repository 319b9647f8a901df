// src/dag/chain.rs

//! Transform chains for `antsApplyTransforms`.
//!
//! The chain is listed in application order for ANTs: the transform computed
//! last comes first, and composition runs right to left.

use std::path::PathBuf;

use crate::dag::node::OutputRef;
use crate::errors::{PipelineError, Result};

/// Where one transform of a chain comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformSource {
    /// A transform file produced outside the graph.
    File(PathBuf),
    /// A transform written by a registration node.
    Output(OutputRef),
}

impl From<PathBuf> for TransformSource {
    fn from(p: PathBuf) -> Self {
        TransformSource::File(p)
    }
}

impl From<OutputRef> for TransformSource {
    fn from(r: OutputRef) -> Self {
        TransformSource::Output(r)
    }
}

/// Ordered transforms, each with an `invert` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformChain {
    entries: Vec<(TransformSource, bool)>,
}

impl TransformChain {
    /// Pair transforms with invert flags. Both lists must be the same length.
    pub fn new(transforms: Vec<TransformSource>, invert: Vec<bool>) -> Result<Self> {
        if transforms.len() != invert.len() {
            return Err(PipelineError::TransformChainMismatch {
                transforms: transforms.len(),
                flags: invert.len(),
            });
        }
        Ok(Self {
            entries: transforms.into_iter().zip(invert).collect(),
        })
    }

    pub fn entries(&self) -> &[(TransformSource, bool)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_flag_count_is_rejected() {
        let err = TransformChain::new(
            vec![
                TransformSource::from(OutputRef::new("coreg_second_pass", "composite_transform")),
                TransformSource::from(OutputRef::new("coreg_first_pass", "composite_transform")),
            ],
            vec![false],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::TransformChainMismatch {
                transforms: 2,
                flags: 1
            }
        ));
    }

    #[test]
    fn keeps_order_and_flags() {
        let chain = TransformChain::new(
            vec![
                TransformSource::from(PathBuf::from("/anat/xfm.h5")),
                TransformSource::from(OutputRef::new("b", "t")),
            ],
            vec![false, true],
        )
        .unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.entries()[1], (TransformSource::Output(OutputRef::new("b", "t")), true));
    }
}
