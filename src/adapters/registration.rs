// src/adapters/registration.rs

//! `antsRegistration` with a single rigid stage and a Mattes mutual
//! information metric.
//!
//! Both the composite transform (`<prefix>Composite.h5`) and the warped
//! moving image (`<prefix>.nii.gz`) are written to the node directory.

use std::path::Path;

use anyhow::Result;

use crate::adapters::{InputSlot, Invocation, ResolvedInputs, ToolAdapter};
use crate::config::RegistrationConfig;

const INPUTS: &[InputSlot] = &[InputSlot::file("fixed_image"), InputSlot::file("moving_image")];
const OUTPUTS: &[&str] = &["composite_transform", "warped_image"];

/// ITK reads its worker thread count from this variable.
pub const ITK_THREADS_ENV: &str = "ITK_GLOBAL_DEFAULT_NUMBER_OF_THREADS";

/// How the moving image is initialised before optimisation
/// (`--initial-moving-transform [ fixed, moving, <mode> ]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterInit {
    /// Match image centres.
    Geometry,
    /// Match centres of mass.
    CenterOfMass,
    /// Align origins.
    Origin,
}

impl CenterInit {
    fn code(self) -> u8 {
        match self {
            CenterInit::Geometry => 0,
            CenterInit::CenterOfMass => 1,
            CenterInit::Origin => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    /// Prefix of every output file.
    pub output_prefix: String,
    pub initial_moving: Option<CenterInit>,
    pub num_threads: usize,
    pub params: RegistrationConfig,
}

impl Registration {
    pub fn new(
        output_prefix: impl Into<String>,
        params: RegistrationConfig,
        num_threads: usize,
    ) -> Self {
        Self {
            output_prefix: output_prefix.into(),
            initial_moving: None,
            num_threads,
            params,
        }
    }

    pub fn with_initial_moving(mut self, init: CenterInit) -> Self {
        self.initial_moving = Some(init);
        self
    }
}

impl ToolAdapter for Registration {
    fn program(&self) -> &'static str {
        "antsRegistration"
    }

    fn input_slots(&self) -> &'static [InputSlot] {
        INPUTS
    }

    fn output_slots(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    fn invocation(&self, inputs: &ResolvedInputs, node_dir: &Path) -> Result<Invocation> {
        let fixed = inputs.file("fixed_image")?;
        let moving = inputs.file("moving_image")?;
        let p = &self.params;

        let prefix = node_dir.join(&self.output_prefix);
        let composite = node_dir.join(format!("{}Composite.h5", self.output_prefix));
        let warped = node_dir.join(format!("{}.nii.gz", self.output_prefix));

        let mut inv = Invocation::new(self.program(), node_dir);
        inv.arg("--collapse-output-transforms")
            .arg("0")
            .arg("--dimensionality")
            .arg("3");
        if let Some(init) = self.initial_moving {
            inv.arg("--initial-moving-transform").arg(format!(
                "[ {}, {}, {} ]",
                fixed.display(),
                moving.display(),
                init.code()
            ));
        }
        inv.arg("--initialize-transforms-per-stage")
            .arg("0")
            .arg("--interpolation")
            .arg(p.interpolation.to_string())
            .arg("--output")
            .arg(format!("[ {}, {} ]", prefix.display(), warped.display()))
            .arg("--transform")
            .arg(format!("Rigid[ {} ]", p.gradient_step))
            .arg("--metric")
            .arg(format!(
                "Mattes[ {}, {}, {}, {}, {}, {} ]",
                fixed.display(),
                moving.display(),
                p.metric_weight,
                p.metric_bins,
                p.sampling_strategy,
                p.sampling_percentage
            ))
            .arg("--convergence")
            .arg(format!(
                "[ {}, {:e}, {} ]",
                join_x(&p.iterations),
                p.convergence_threshold,
                p.convergence_window
            ))
            .arg("--smoothing-sigmas")
            .arg(format!("{}vox", join_x(&p.smoothing_sigmas)))
            .arg("--shrink-factors")
            .arg(join_x(&p.shrink_factors))
            .arg("--use-histogram-matching")
            .arg(if p.use_histogram_matching { "1" } else { "0" })
            .arg("--winsorize-image-intensities")
            .arg("[ 0.0, 1.0 ]")
            .arg("--write-composite-transform")
            .arg("1");

        inv.env(ITK_THREADS_ENV, self.num_threads.max(1).to_string())
            .input(fixed)
            .input(moving)
            .output("composite_transform", composite)
            .output("warped_image", warped);
        Ok(inv)
    }
}

fn join_x<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("x")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn inputs() -> ResolvedInputs {
        ResolvedInputs::new()
            .with_file("fixed_image", "/anat/mask.nii.gz")
            .with_file("moving_image", "/work/skull_strip/pet_bet_mask.nii.gz")
    }

    #[test]
    fn first_pass_command_line() {
        let adapter = Registration::new("petmask2anatmask", RegistrationConfig::default(), 8)
            .with_initial_moving(CenterInit::Geometry);
        let inv = adapter.invocation(&inputs(), Path::new("/work/coreg_first_pass")).unwrap();

        let expected = [
            "--collapse-output-transforms",
            "0",
            "--dimensionality",
            "3",
            "--initial-moving-transform",
            "[ /anat/mask.nii.gz, /work/skull_strip/pet_bet_mask.nii.gz, 0 ]",
            "--initialize-transforms-per-stage",
            "0",
            "--interpolation",
            "Linear",
            "--output",
            "[ /work/coreg_first_pass/petmask2anatmask, /work/coreg_first_pass/petmask2anatmask.nii.gz ]",
            "--transform",
            "Rigid[ 0.3 ]",
            "--metric",
            "Mattes[ /anat/mask.nii.gz, /work/skull_strip/pet_bet_mask.nii.gz, 1, 32, Regular, 0.3 ]",
            "--convergence",
            "[ 1000x100, 1e-12, 20 ]",
            "--smoothing-sigmas",
            "4x2vox",
            "--shrink-factors",
            "15x8",
            "--use-histogram-matching",
            "0",
            "--winsorize-image-intensities",
            "[ 0.0, 1.0 ]",
            "--write-composite-transform",
            "1",
        ];
        assert_eq!(inv.args, expected);
        assert_eq!(inv.env, vec![(ITK_THREADS_ENV.to_string(), "8".to_string())]);
        assert_eq!(
            inv.outputs["composite_transform"],
            PathBuf::from("/work/coreg_first_pass/petmask2anatmaskComposite.h5")
        );
    }

    #[test]
    fn second_pass_has_no_initial_transform() {
        let adapter = Registration::new("pet2anat", RegistrationConfig::default(), 1);
        let inv = adapter.invocation(&inputs(), Path::new("/w")).unwrap();
        assert!(!inv.args.iter().any(|a| a == "--initial-moving-transform"));
        assert_eq!(inv.outputs["warped_image"], PathBuf::from("/w/pet2anat.nii.gz"));
    }
}
