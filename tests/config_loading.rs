use std::io::Write;

use tempfile::NamedTempFile;

use petbrainprep::config::{load_and_validate, load_from_path};
use petbrainprep::errors::PipelineError;
use petbrainprep::types::{Device, Interpolation, OutputType, SkullStripTool};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn no_config_file_means_defaults() {
    let cfg = load_and_validate(None).unwrap();

    assert_eq!(cfg.output_type, OutputType::NiftiGz);
    assert_eq!(cfg.template.name, "MNI152NLin2009cAsym");
    assert_eq!(cfg.skull_strip.tool, SkullStripTool::HdBet);
    assert_eq!(cfg.registration.iterations, vec![1000, 100]);
    assert!(cfg.smoothing.fwhm.is_none());
}

#[test]
fn sections_override_individual_fields() {
    let file = config_file(
        r#"
output_type = "NIFTI"

[skull_strip]
tool = "synthstrip"
device = 1
use_gpu = true

[registration]
iterations = [500, 250, 50]
smoothing_sigmas = [4.0, 2.0, 1.0]
shrink_factors = [8, 4, 2]

[apply_transforms]
interpolation = "BSpline"

[smoothing]
fwhm = 8.0
"#,
    );

    let cfg = load_and_validate(Some(file.path())).unwrap();

    assert_eq!(cfg.output_type, OutputType::Nifti);
    assert_eq!(cfg.skull_strip.tool, SkullStripTool::SynthStrip);
    assert_eq!(cfg.skull_strip.device, Device::Gpu(1));
    assert!(cfg.skull_strip.use_gpu);
    assert_eq!(cfg.registration.shrink_factors, vec![8, 4, 2]);
    assert_eq!(cfg.registration.gradient_step, 0.3);
    assert_eq!(cfg.apply_transforms.interpolation, Interpolation::BSpline);
    assert_eq!(cfg.smoothing.fwhm, Some(8.0));
}

#[test]
fn unknown_keys_are_rejected() {
    let file = config_file(
        r#"
[registration]
iteration = [10]
"#,
    );

    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, PipelineError::TomlError(_)), "{err:?}");
}

#[test]
fn per_level_lists_must_agree() {
    let file = config_file(
        r#"
[registration]
iterations = [1000, 100, 10]
"#,
    );

    let err = load_and_validate(Some(file.path())).unwrap_err();
    match err {
        PipelineError::ConfigError(msg) => assert!(msg.contains("[registration]"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn negative_fwhm_is_a_config_error() {
    let file = config_file(
        r#"
[smoothing]
fwhm = -2.0
"#,
    );

    let err = load_and_validate(Some(file.path())).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let err = load_and_validate(Some(std::path::Path::new("/nonexistent/petbrainprep.toml")))
        .unwrap_err();
    assert!(matches!(err, PipelineError::IoError(_)));
}
