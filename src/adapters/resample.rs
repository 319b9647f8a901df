// src/adapters/resample.rs

//! ANTs `ResampleImage`: resample an image to a target voxel spacing.
//!
//! Runs once before the graph, to give the native-space resampling node a
//! reference grid at PET resolution.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::adapters::{InputSlot, Invocation, ResolvedInputs, ToolAdapter};

const INPUTS: &[InputSlot] = &[InputSlot::file("input_image")];
const OUTPUTS: &[&str] = &["output_image"];

#[derive(Debug, Clone)]
pub struct Resample {
    /// Target spacing in mm.
    pub spacing: [f64; 3],
    /// `ResampleImage` interpolation code.
    pub interpolation: u8,
    pub output: PathBuf,
}

impl ToolAdapter for Resample {
    fn program(&self) -> &'static str {
        "ResampleImage"
    }

    fn input_slots(&self) -> &'static [InputSlot] {
        INPUTS
    }

    fn output_slots(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    fn invocation(&self, inputs: &ResolvedInputs, node_dir: &Path) -> Result<Invocation> {
        let input = inputs.file("input_image")?;
        let [x, y, z] = self.spacing;

        let mut inv = Invocation::new(self.program(), node_dir);
        inv.arg("3")
            .path_arg(input)
            .path_arg(&self.output)
            .arg(format!("{x}x{y}x{z}"))
            .arg("0")
            .arg(self.interpolation.to_string())
            .input(input)
            .output("output_image", self.output.clone());
        Ok(inv)
    }
}
