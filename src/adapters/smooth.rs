// src/adapters/smooth.rs

//! Gaussian smoothing with `fslmaths -kernel gauss <sigma> -fmean`.

use std::path::Path;

use anyhow::Result;

use crate::adapters::naming::derive_output_with_ext;
use crate::adapters::{InputSlot, Invocation, ResolvedInputs, ToolAdapter};
use crate::types::OutputType;

const INPUTS: &[InputSlot] = &[InputSlot::file("in_file")];
const OUTPUTS: &[&str] = &["smoothed_file"];

#[derive(Debug, Clone)]
pub struct Smooth {
    /// Kernel full width at half maximum, in mm.
    pub fwhm: f64,
    pub output_type: OutputType,
}

impl Smooth {
    pub fn new(fwhm: f64, output_type: OutputType) -> Self {
        Self { fwhm, output_type }
    }

    /// Standard deviation of the Gaussian with the configured FWHM.
    pub fn sigma(&self) -> f64 {
        self.fwhm / (8.0 * std::f64::consts::LN_2).sqrt()
    }
}

impl ToolAdapter for Smooth {
    fn program(&self) -> &'static str {
        "fslmaths"
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
            derive_output_with_ext(node_dir, in_file, "_smooth", self.output_type.extension());

        let mut inv = Invocation::new(self.program(), node_dir);
        inv.path_arg(in_file)
            .arg("-kernel")
            .arg("gauss")
            .arg(format!("{:.3}", self.sigma()))
            .arg("-fmean")
            .path_arg(&out_file)
            .env("FSLOUTPUTTYPE", self.output_type.fsl_name())
            .input(in_file)
            .output("smoothed_file", out_file);
        Ok(inv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_fwhm_to_sigma() {
        let adapter = Smooth::new(6.0, OutputType::NiftiGz);
        assert!((adapter.sigma() - 2.5480).abs() < 1e-3);

        let inputs = ResolvedInputs::new().with_file("in_file", "/w/norm/pet_trans.nii.gz");
        let inv = adapter.invocation(&inputs, Path::new("/w/smooth")).unwrap();
        assert_eq!(
            inv.command_line(),
            "fslmaths /w/norm/pet_trans.nii.gz -kernel gauss 2.548 -fmean \
             /w/smooth/pet_trans_smooth.nii.gz"
        );
        assert_eq!(
            inv.env,
            vec![("FSLOUTPUTTYPE".to_string(), "NIFTI_GZ".to_string())]
        );
    }
}
