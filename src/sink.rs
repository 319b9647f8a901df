// src/sink.rs

//! Copies selected node outputs into the participant's results tree:
//! `<output>/sub-<label>/<category>/<file name>`.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::dag::PipelineGraph;
use crate::engine::ArtifactStore;
use crate::errors::Result;
use crate::fs::FileSystem;

/// Results sub-directory an artifact is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SinkCategory {
    Crop,
    SkullStrip,
    Coreg,
    Transforms,
    Norm,
    Smooth,
}

impl SinkCategory {
    pub fn dir_name(self) -> &'static str {
        match self {
            SinkCategory::Crop => "crop",
            SinkCategory::SkullStrip => "skullstrip",
            SinkCategory::Coreg => "coreg",
            SinkCategory::Transforms => "transforms",
            SinkCategory::Norm => "norm",
            SinkCategory::Smooth => "smooth",
        }
    }
}

impl fmt::Display for SinkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug)]
pub struct ArtifactSink<'a> {
    fs: &'a dyn FileSystem,
    results_dir: PathBuf,
}

impl<'a> ArtifactSink<'a> {
    pub fn new(fs: &'a dyn FileSystem, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            results_dir: results_dir.into(),
        }
    }

    /// Where an artifact of the given category lands.
    pub fn destination(&self, category: SinkCategory, artifact: &Path) -> PathBuf {
        let mut dest = self.results_dir.join(category.dir_name());
        if let Some(name) = artifact.file_name() {
            dest.push(name);
        }
        dest
    }

    /// Copy every routed output of `graph`. Returns the written paths.
    pub fn deliver(
        &self,
        graph: &PipelineGraph,
        artifacts: &ArtifactStore,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(graph.sink_routes().len());

        for route in graph.sink_routes() {
            let source = artifacts.resolve(&route.output).with_context(|| {
                format!(
                    "collecting {} for the {} results",
                    route.output, route.category
                )
            })?;
            let dest = self.destination(route.category, source);
            self.fs.copy(source, &dest)?;
            debug!(from = %source.display(), to = %dest.display(), "artifact delivered");
            written.push(dest);
        }

        info!(
            count = written.len(),
            results_dir = %self.results_dir.display(),
            "artifacts delivered"
        );
        Ok(written)
    }
}
