// src/types.rs

//! Small enums shared by the configuration model and the tool adapters.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which skull-stripping tool runs on the cropped PET image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SkullStripTool {
    #[serde(rename = "hd-bet")]
    HdBet,
    #[serde(rename = "synthstrip")]
    SynthStrip,
}

impl Default for SkullStripTool {
    fn default() -> Self {
        SkullStripTool::HdBet
    }
}

/// HD-BET prediction mode.
///
/// - `Fast`: a single parameter set.
/// - `Accurate`: an ensemble of the five cross-validation parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetMode {
    Fast,
    Accurate,
}

impl Default for BetMode {
    fn default() -> Self {
        BetMode::Fast
    }
}

impl fmt::Display for BetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetMode::Fast => f.write_str("fast"),
            BetMode::Accurate => f.write_str("accurate"),
        }
    }
}

/// Device HD-BET predicts on: the CPU or a GPU by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "DeviceRepr")]
pub enum Device {
    Cpu,
    Gpu(u32),
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeviceRepr {
    Index(u32),
    Name(String),
}

impl TryFrom<DeviceRepr> for Device {
    type Error = String;

    fn try_from(repr: DeviceRepr) -> Result<Self, Self::Error> {
        match repr {
            DeviceRepr::Index(idx) => Ok(Device::Gpu(idx)),
            DeviceRepr::Name(name) => name.parse(),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "cpu" {
            return Ok(Device::Cpu);
        }
        s.parse::<u32>()
            .map(Device::Gpu)
            .map_err(|_| format!("invalid device: {s} (expected \"cpu\" or a GPU index)"))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Gpu(idx) => write!(f, "{idx}"),
        }
    }
}

/// Interpolation kinds understood by the ANTs tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Interpolation {
    Linear,
    NearestNeighbor,
    BSpline,
    Gaussian,
    LanczosWindowedSinc,
    MultiLabel,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Linear
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Interpolation::Linear => "Linear",
            Interpolation::NearestNeighbor => "NearestNeighbor",
            Interpolation::BSpline => "BSpline",
            Interpolation::Gaussian => "Gaussian",
            Interpolation::LanczosWindowedSinc => "LanczosWindowedSinc",
            Interpolation::MultiLabel => "MultiLabel",
        };
        f.write_str(s)
    }
}

/// Image format written by tools that honour an output-type setting
/// (AFNI `-prefix` extension, FSL `FSLOUTPUTTYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum OutputType {
    #[serde(rename = "NIFTI")]
    Nifti,
    #[serde(rename = "NIFTI_GZ")]
    NiftiGz,
}

impl Default for OutputType {
    fn default() -> Self {
        OutputType::NiftiGz
    }
}

impl OutputType {
    pub fn extension(self) -> &'static str {
        match self {
            OutputType::Nifti => "nii",
            OutputType::NiftiGz => "nii.gz",
        }
    }

    /// Value for the `FSLOUTPUTTYPE` environment variable.
    pub fn fsl_name(self) -> &'static str {
        match self {
            OutputType::Nifti => "NIFTI",
            OutputType::NiftiGz => "NIFTI_GZ",
        }
    }
}

/// Sampling strategy for the registration metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SamplingStrategy {
    None,
    Regular,
    Random,
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        SamplingStrategy::Regular
    }
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SamplingStrategy::None => "None",
            SamplingStrategy::Regular => "Regular",
            SamplingStrategy::Random => "Random",
        };
        f.write_str(s)
    }
}
