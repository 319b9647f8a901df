// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `petbrainprep`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "petbrainprep",
    version,
    about = "Crop, skull-strip, coregister and normalise a participant's PET image.",
    long_about = None
)]
pub struct CliArgs {
    /// BIDS dataset root holding `sub-<label>/pet/sub-<label>_pet.nii.gz`.
    #[arg(value_name = "BIDS_DIR")]
    pub bids_dir: PathBuf,

    /// Where results are written, one `sub-<label>` directory per participant.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Anatomical derivatives (preprocessed T1w, brain mask and the
    /// T1w-to-template transform).
    #[arg(value_name = "ANAT_DERIVATIVES_DIR")]
    pub anat_derivatives_dir: PathBuf,

    /// Participant to process, with or without the `sub-` prefix.
    #[arg(long, value_name = "LABEL")]
    pub participant_label: String,

    /// Maximum number of tools running at once, also passed to tools as
    /// their thread count. Defaults to the number of CPUs.
    #[arg(long, value_name = "N")]
    pub nprocs: Option<usize>,

    /// Smooth the template-space image with a Gaussian of this FWHM (mm).
    #[arg(long, value_name = "MM")]
    pub fwhm: Option<f64>,

    /// Directory for intermediate files. Default: `<OUTPUT_DIR>/work`.
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Tool parameter overrides (TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PETBRAINPREP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve inputs and print every command, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
