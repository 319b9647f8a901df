// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed tool parameter model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate value ranges and per-stage list lengths (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ApplyTransformsConfig, CropConfig, PipelineConfig, RegistrationConfig, ResampleConfig,
    SkullStripConfig, SmoothingConfig, TemplateConfig,
};
pub use validate::{validate_config, validate_fwhm};
