// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{
    BetMode, Device, Interpolation, OutputType, SamplingStrategy, SkullStripTool,
};

/// Tool parameters for one pipeline run, as read from an optional TOML file.
///
/// Every section and field is optional; the defaults reproduce the standard
/// PET preprocessing setup:
///
/// ```toml
/// output_type = "NIFTI_GZ"
///
/// [template]
/// name = "MNI152NLin2009cAsym"
/// resolution = 2
///
/// [skull_strip]
/// tool = "hd-bet"
/// mode = "fast"
/// device = "cpu"
///
/// [registration]
/// iterations = [1000, 100]
/// smoothing_sigmas = [4.0, 2.0]
/// shrink_factors = [15, 8]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Image format for tools that honour an output-type setting.
    #[serde(default)]
    pub output_type: OutputType,

    #[serde(default)]
    pub template: TemplateConfig,

    #[serde(default)]
    pub crop: CropConfig,

    #[serde(default)]
    pub skull_strip: SkullStripConfig,

    #[serde(default)]
    pub registration: RegistrationConfig,

    #[serde(default)]
    pub apply_transforms: ApplyTransformsConfig,

    #[serde(default)]
    pub smoothing: SmoothingConfig,

    #[serde(default)]
    pub resample: ResampleConfig,
}

/// `[template]` section: the standard space the PET image is normalised to.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// TemplateFlow identifier. Also names the anatomical-to-template
    /// transform (`from-T1w_to-<name>`).
    #[serde(default = "default_template_name")]
    pub name: String,

    /// Template resolution index (`res-02` for 2).
    #[serde(default = "default_template_resolution")]
    pub resolution: u8,

    /// Explicit template image; skips the TemplateFlow lookup.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_template_name() -> String {
    "MNI152NLin2009cAsym".to_string()
}

fn default_template_resolution() -> u8 {
    2
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            name: default_template_name(),
            resolution: default_template_resolution(),
            path: None,
        }
    }
}

/// `[crop]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropConfig {
    /// Voxels of padding kept around the bounding box.
    #[serde(default = "default_crop_padding")]
    pub padding: u32,
}

fn default_crop_padding() -> u32 {
    10
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            padding: default_crop_padding(),
        }
    }
}

/// `[skull_strip]` section.
///
/// `mode`, `device`, `tta`, `postprocess` and `save_mask` apply to HD-BET;
/// `use_gpu`, `border`, `no_csf` and `model` apply to SynthStrip.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkullStripConfig {
    #[serde(default)]
    pub tool: SkullStripTool,

    #[serde(default)]
    pub mode: BetMode,

    #[serde(default)]
    pub device: Device,

    /// Test-time augmentation; slow on CPU, so off by default.
    #[serde(default)]
    pub tta: bool,

    #[serde(default)]
    pub postprocess: Option<bool>,

    #[serde(default)]
    pub save_mask: Option<bool>,

    #[serde(default)]
    pub use_gpu: bool,

    /// Mask border threshold in mm.
    #[serde(default)]
    pub border: Option<f64>,

    #[serde(default)]
    pub no_csf: bool,

    #[serde(default)]
    pub model: Option<PathBuf>,
}

/// `[registration]` section: one rigid stage, shared by both passes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
    #[serde(default = "default_gradient_step")]
    pub gradient_step: f64,

    /// Iterations per resolution level.
    #[serde(default = "default_iterations")]
    pub iterations: Vec<u32>,

    #[serde(default = "default_metric_weight")]
    pub metric_weight: f64,

    /// Histogram bins of the Mattes mutual information metric.
    #[serde(default = "default_metric_bins")]
    pub metric_bins: u32,

    #[serde(default)]
    pub sampling_strategy: SamplingStrategy,

    #[serde(default = "default_sampling_percentage")]
    pub sampling_percentage: f64,

    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    #[serde(default = "default_convergence_window")]
    pub convergence_window: u32,

    /// Smoothing sigma per resolution level, in voxels.
    #[serde(default = "default_smoothing_sigmas")]
    pub smoothing_sigmas: Vec<f64>,

    #[serde(default = "default_shrink_factors")]
    pub shrink_factors: Vec<u32>,

    #[serde(default)]
    pub use_histogram_matching: bool,

    #[serde(default)]
    pub interpolation: Interpolation,
}

fn default_gradient_step() -> f64 {
    0.3
}

fn default_iterations() -> Vec<u32> {
    vec![1000, 100]
}

fn default_metric_weight() -> f64 {
    1.0
}

fn default_metric_bins() -> u32 {
    32
}

fn default_sampling_percentage() -> f64 {
    0.3
}

fn default_convergence_threshold() -> f64 {
    1e-12
}

fn default_convergence_window() -> u32 {
    20
}

fn default_smoothing_sigmas() -> Vec<f64> {
    vec![4.0, 2.0]
}

fn default_shrink_factors() -> Vec<u32> {
    vec![15, 8]
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            gradient_step: default_gradient_step(),
            iterations: default_iterations(),
            metric_weight: default_metric_weight(),
            metric_bins: default_metric_bins(),
            sampling_strategy: SamplingStrategy::default(),
            sampling_percentage: default_sampling_percentage(),
            convergence_threshold: default_convergence_threshold(),
            convergence_window: default_convergence_window(),
            smoothing_sigmas: default_smoothing_sigmas(),
            shrink_factors: default_shrink_factors(),
            use_histogram_matching: false,
            interpolation: Interpolation::default(),
        }
    }
}

/// `[apply_transforms]` section, shared by the three resampling nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyTransformsConfig {
    #[serde(default)]
    pub interpolation: Interpolation,

    /// Value for voxels mapped from outside the input image.
    #[serde(default)]
    pub default_value: f64,

    /// Compute in single precision (`--float`).
    #[serde(default = "default_true")]
    pub float: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ApplyTransformsConfig {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::default(),
            default_value: 0.0,
            float: true,
        }
    }
}

/// `[smoothing]` section. `--fwhm` on the command line takes precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmoothingConfig {
    /// Gaussian kernel FWHM in mm; no smoothing when unset.
    #[serde(default)]
    pub fwhm: Option<f64>,
}

/// `[resample]` section: resampling of the anatomical reference to PET voxel
/// size before the graph runs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResampleConfig {
    /// `ResampleImage` interpolation code: 0 linear, 1 nearest neighbour,
    /// 2 gaussian, 3 windowed sinc, 4 B-spline.
    #[serde(default)]
    pub interpolation: u8,
}
