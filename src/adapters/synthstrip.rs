// src/adapters/synthstrip.rs

//! SynthStrip brain extraction through the `synthstrip-docker` wrapper.
//!
//! The wrapper mounts its working directory into the container, so the input
//! is passed relative to the node directory. SynthStrip exits with status 0
//! even when it fails to read its input, and only reports the problem on
//! stderr, so any stderr output fails the run.

use std::path::Path;

use anyhow::Result;

use crate::adapters::naming::{derive_output, relative_to};
use crate::adapters::{InputSlot, Invocation, ResolvedInputs, StderrPolicy, ToolAdapter};
use crate::config::SkullStripConfig;

const INPUTS: &[InputSlot] = &[InputSlot::file("in_file")];
const OUTPUTS: &[&str] = &["out_file", "mask_file"];

#[derive(Debug, Clone, Default)]
pub struct SynthStrip {
    pub use_gpu: bool,
    pub border: Option<f64>,
    pub no_csf: bool,
    pub model: Option<std::path::PathBuf>,
}

impl SynthStrip {
    pub fn from_config(cfg: &SkullStripConfig) -> Self {
        Self {
            use_gpu: cfg.use_gpu,
            border: cfg.border,
            no_csf: cfg.no_csf,
            model: cfg.model.clone(),
        }
    }
}

impl ToolAdapter for SynthStrip {
    fn program(&self) -> &'static str {
        "synthstrip-docker"
    }

    fn input_slots(&self) -> &'static [InputSlot] {
        INPUTS
    }

    fn output_slots(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    fn stderr_policy(&self) -> StderrPolicy {
        StderrPolicy::Fail
    }

    fn invocation(&self, inputs: &ResolvedInputs, node_dir: &Path) -> Result<Invocation> {
        let in_file = inputs.file("in_file")?;
        let out_file = derive_output(node_dir, in_file, "_brain");
        let mask_file = derive_output(node_dir, &out_file, "_mask");

        let mut inv = Invocation::new(self.program(), node_dir);
        inv.arg("-i")
            .path_arg(&relative_to(in_file, node_dir))
            .arg("-o")
            .path_arg(&out_file)
            .arg("-m")
            .path_arg(&mask_file);
        if self.use_gpu {
            inv.arg("-g");
        }
        if let Some(border) = self.border {
            inv.arg("-b").arg(format!("{border:.6}"));
        }
        if self.no_csf {
            inv.arg("--no-csf");
        }
        if let Some(model) = &self.model {
            inv.arg("--model").path_arg(model).input(model);
        }
        inv.input(in_file)
            .output("out_file", out_file)
            .output("mask_file", mask_file);
        inv.stderr_policy = self.stderr_policy();
        Ok(inv)
    }
}
