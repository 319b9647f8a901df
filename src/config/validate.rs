// src/config/validate.rs

use crate::config::model::{PipelineConfig, RegistrationConfig};
use crate::errors::{PipelineError, Result};

pub fn validate_config(cfg: &PipelineConfig) -> Result<()> {
    validate_template(cfg)?;
    validate_skull_strip(cfg)?;
    validate_registration(&cfg.registration)?;
    if let Some(fwhm) = cfg.smoothing.fwhm {
        validate_fwhm(fwhm)?;
    }
    validate_resample(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> PipelineError {
    PipelineError::ConfigError(msg.into())
}

fn validate_template(cfg: &PipelineConfig) -> Result<()> {
    if cfg.template.name.trim().is_empty() {
        return Err(config_error("[template].name must not be empty"));
    }
    if cfg.template.resolution == 0 {
        return Err(config_error("[template].resolution must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_skull_strip(cfg: &PipelineConfig) -> Result<()> {
    if let Some(border) = cfg.skull_strip.border {
        if !border.is_finite() {
            return Err(config_error(format!(
                "[skull_strip].border must be a finite number (got {border})"
            )));
        }
    }
    Ok(())
}

fn validate_registration(reg: &RegistrationConfig) -> Result<()> {
    let levels = reg.iterations.len();
    if levels == 0 {
        return Err(config_error(
            "[registration].iterations must list at least one resolution level",
        ));
    }
    if reg.smoothing_sigmas.len() != levels || reg.shrink_factors.len() != levels {
        return Err(config_error(format!(
            "[registration] expects one entry per resolution level: iterations has {}, \
             smoothing_sigmas has {}, shrink_factors has {}",
            levels,
            reg.smoothing_sigmas.len(),
            reg.shrink_factors.len()
        )));
    }
    if reg.shrink_factors.contains(&0) {
        return Err(config_error("[registration].shrink_factors must all be >= 1"));
    }
    if !(reg.gradient_step > 0.0) {
        return Err(config_error(format!(
            "[registration].gradient_step must be > 0 (got {})",
            reg.gradient_step
        )));
    }
    if !(reg.sampling_percentage > 0.0 && reg.sampling_percentage <= 1.0) {
        return Err(config_error(format!(
            "[registration].sampling_percentage must be in (0, 1] (got {})",
            reg.sampling_percentage
        )));
    }
    if reg.metric_bins == 0 {
        return Err(config_error("[registration].metric_bins must be >= 1 (got 0)"));
    }
    Ok(())
}

/// A smoothing kernel width must be a positive number of millimetres.
pub fn validate_fwhm(fwhm: f64) -> Result<()> {
    if !(fwhm.is_finite() && fwhm > 0.0) {
        return Err(config_error(format!(
            "smoothing FWHM must be a positive number of mm (got {fwhm})"
        )));
    }
    Ok(())
}

fn validate_resample(cfg: &PipelineConfig) -> Result<()> {
    if cfg.resample.interpolation > 4 {
        return Err(config_error(format!(
            "[resample].interpolation must be between 0 and 4 (got {})",
            cfg.resample.interpolation
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate_config(&PipelineConfig::default()).unwrap();
    }

    #[test]
    fn mismatched_stage_lists_are_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.registration.shrink_factors = vec![8];
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("shrink_factors has 1"));
    }

    #[test]
    fn sampling_percentage_must_be_a_fraction() {
        let mut cfg = PipelineConfig::default();
        cfg.registration.sampling_percentage = 1.5;
        assert!(matches!(
            validate_config(&cfg),
            Err(PipelineError::ConfigError(_))
        ));
    }

    #[test]
    fn non_positive_fwhm_is_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.smoothing.fwhm = Some(0.0);
        assert!(validate_config(&cfg).is_err());
        assert!(validate_fwhm(f64::NAN).is_err());
        validate_fwhm(6.0).unwrap();
    }
}
