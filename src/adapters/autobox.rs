// src/adapters/autobox.rs

//! AFNI `3dAutobox`: crop an image to the bounding box of its non-zero
//! voxels, plus padding.

use std::path::Path;

use anyhow::Result;

use crate::adapters::naming::derive_output_with_ext;
use crate::adapters::{InputSlot, Invocation, ResolvedInputs, ToolAdapter};
use crate::config::CropConfig;
use crate::types::OutputType;

const INPUTS: &[InputSlot] = &[InputSlot::file("in_file")];
const OUTPUTS: &[&str] = &["out_file"];

#[derive(Debug, Clone)]
pub struct Autobox {
    pub padding: u32,
    pub output_type: OutputType,
}

impl Autobox {
    pub fn from_config(cfg: &CropConfig, output_type: OutputType) -> Self {
        Self {
            padding: cfg.padding,
            output_type,
        }
    }
}

impl ToolAdapter for Autobox {
    fn program(&self) -> &'static str {
        "3dAutobox"
    }

    fn input_slots(&self) -> &'static [InputSlot] {
        INPUTS
    }

    fn output_slots(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    fn invocation(&self, inputs: &ResolvedInputs, node_dir: &Path) -> Result<Invocation> {
        let in_file = inputs.file("in_file")?;
        let out_file =
            derive_output_with_ext(node_dir, in_file, "_autobox", self.output_type.extension());

        let mut inv = Invocation::new(self.program(), node_dir);
        inv.arg("-input")
            .path_arg(in_file)
            .arg("-prefix")
            .path_arg(&out_file)
            .arg("-npad")
            .arg(self.padding.to_string())
            .input(in_file)
            .output("out_file", out_file);
        Ok(inv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn crops_into_node_dir_with_padding() {
        let adapter = Autobox::from_config(&CropConfig::default(), OutputType::NiftiGz);
        let inputs =
            ResolvedInputs::new().with_file("in_file", "/bids/sub-01/pet/sub-01_pet.nii.gz");
        let inv = adapter.invocation(&inputs, Path::new("/work/crop_image")).unwrap();

        assert_eq!(
            inv.command_line(),
            "3dAutobox -input /bids/sub-01/pet/sub-01_pet.nii.gz \
             -prefix /work/crop_image/sub-01_pet_autobox.nii.gz -npad 10"
        );
        assert_eq!(
            inv.outputs["out_file"],
            PathBuf::from("/work/crop_image/sub-01_pet_autobox.nii.gz")
        );
    }
}
