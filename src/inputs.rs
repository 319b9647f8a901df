// src/inputs.rs

//! Participant input resolution.
//!
//! Locates the files a run needs by naming convention (BIDS for the raw PET
//! image, fMRIPrep-style derivatives for the anatomical reference) and builds
//! the immutable [`ParticipantContext`] every later stage works from.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::pipeline::SmoothingVariant;
use crate::template::resolve_template;

/// Everything a run was asked to do, as given on the command line.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub bids_dir: PathBuf,
    pub output_dir: PathBuf,
    pub anat_dir: PathBuf,
    /// Raw label, with or without the `sub-` prefix.
    pub participant_label: String,
    /// Defaults to `<output_dir>/work`.
    pub work_dir: Option<PathBuf>,
    pub nprocs: usize,
    pub smoothing: SmoothingVariant,
    /// TemplateFlow cache root, used unless the config names a template file.
    pub templateflow_home: PathBuf,
}

impl RunRequest {
    pub fn work_root(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("work"))
    }
}

const LABEL_PATTERN: &str = r"^[A-Za-z0-9]+$";

/// Strip an optional `sub-` prefix and check the label is alphanumeric.
pub fn normalize_label(raw: &str) -> Result<String> {
    let label = raw.trim();
    let label = label.strip_prefix("sub-").unwrap_or(label);
    let pattern = Regex::new(LABEL_PATTERN).map_err(anyhow::Error::from)?;
    if pattern.is_match(label) {
        Ok(label.to_string())
    } else {
        Err(PipelineError::InvalidLabel(raw.to_string()))
    }
}

/// The four files a participant needs before anything runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInputs {
    pub pet: PathBuf,
    pub t1w: PathBuf,
    pub brain_mask: PathBuf,
    pub anat_to_template: PathBuf,
}

impl ParticipantInputs {
    /// Expected locations, for a label without the `sub-` prefix.
    pub fn locate(bids_dir: &Path, anat_dir: &Path, label: &str, template: &str) -> Self {
        let sub = format!("sub-{label}");
        let anat = anat_dir.join(&sub).join("anat");
        Self {
            pet: bids_dir.join(&sub).join("pet").join(format!("{sub}_pet.nii.gz")),
            t1w: anat.join(format!("{sub}_desc-preproc_T1w.nii.gz")),
            brain_mask: anat.join(format!("{sub}_desc-brain_mask.nii.gz")),
            anat_to_template: anat.join(format!(
                "{sub}_from-T1w_to-{template}_mode-image_xfm.h5"
            )),
        }
    }

    fn paths(&self) -> [&Path; 4] {
        [&self.pet, &self.t1w, &self.brain_mask, &self.anat_to_template]
    }

    /// The files that do not exist, in a fixed order.
    pub fn missing(&self, fs: &dyn FileSystem) -> Vec<PathBuf> {
        self.paths()
            .into_iter()
            .filter(|p| !fs.is_file(p))
            .map(Path::to_path_buf)
            .collect()
    }
}

/// Immutable description of one participant's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantContext {
    /// Label without the `sub-` prefix.
    pub label: String,
    pub inputs: ParticipantInputs,
    /// The anatomical reference resampled to PET voxel size; written by the
    /// pre-step, so it need not exist yet.
    pub t1w_resampled: PathBuf,
    pub template: PathBuf,
    /// `<output>/sub-<label>`.
    pub results_dir: PathBuf,
    /// `<work>/sub-<label>`; node directories live below it.
    pub work_dir: PathBuf,
}

impl ParticipantContext {
    pub fn subject(&self) -> String {
        format!("sub-{}", self.label)
    }

    pub fn node_dir(&self, node: &str) -> PathBuf {
        self.work_dir.join(node)
    }
}

/// Validate the label, resolve inputs and the template, and derive all
/// participant paths. No process is started and nothing is written.
pub fn build_context(
    fs: &dyn FileSystem,
    request: &RunRequest,
    config: &PipelineConfig,
) -> Result<ParticipantContext> {
    let label = normalize_label(&request.participant_label)?;
    let sub = format!("sub-{label}");

    let inputs = ParticipantInputs::locate(
        &request.bids_dir,
        &request.anat_dir,
        &label,
        &config.template.name,
    );
    let template = resolve_template(&config.template, &request.templateflow_home);

    let mut missing = inputs.missing(fs);
    if !fs.is_file(&template) {
        missing.push(template.clone());
    }
    if !missing.is_empty() {
        return Err(PipelineError::MissingInputs(missing));
    }
    debug!(?inputs, template = %template.display(), "participant inputs resolved");

    let work_dir = request.work_root().join(&sub);
    let ctx = ParticipantContext {
        t1w_resampled: work_dir.join(format!("{sub}_desc-preproc_resampled-to-PET_T1w.nii.gz")),
        results_dir: request.output_dir.join(&sub),
        work_dir,
        template,
        inputs,
        label,
    };

    info!(
        participant = %ctx.subject(),
        work_dir = %ctx.work_dir.display(),
        "participant context ready"
    );
    Ok(ctx)
}
