// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::PipelineConfig;
use crate::config::validate::validate_config;
use crate::errors::Result;

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; it does **not** check value
/// ranges. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: PipelineConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load the configuration for a run and validate it.
///
/// With no path, the built-in defaults are used (and still validated, which
/// keeps the defaults honest).
pub fn load_and_validate(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading pipeline config");
            load_from_path(path)?
        }
        None => PipelineConfig::default(),
    };
    validate_config(&config)?;
    Ok(config)
}
