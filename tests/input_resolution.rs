use petbrainprep::config::PipelineConfig;
use petbrainprep::errors::PipelineError;
use petbrainprep::fs::RealFileSystem;
use petbrainprep::inputs::build_context;
use petbrainprep::pipeline::SmoothingVariant;
use petbrainprep_test_utils::fixtures::ParticipantFixture;

#[test]
fn complete_participant_resolves_every_path() {
    let fx = ParticipantFixture::new("01");
    let request = fx.request(2, SmoothingVariant::Without);

    let ctx = build_context(&RealFileSystem, &request, &PipelineConfig::default()).unwrap();

    assert_eq!(ctx.label, "01");
    assert_eq!(ctx.inputs, fx.inputs());
    assert_eq!(ctx.template, fx.template());
    assert_eq!(ctx.results_dir, fx.output_dir().join("sub-01"));
    assert_eq!(ctx.work_dir, fx.output_dir().join("work").join("sub-01"));
    assert!(ctx.t1w_resampled.starts_with(&ctx.work_dir));
}

#[test]
fn missing_mask_is_reported_before_anything_runs() {
    let fx = ParticipantFixture::new("01");
    fx.remove(&fx.inputs().brain_mask);

    let err = build_context(
        &RealFileSystem,
        &fx.request(2, SmoothingVariant::Without),
        &PipelineConfig::default(),
    )
    .unwrap_err();

    match err {
        PipelineError::MissingInputs(paths) => assert_eq!(paths, vec![fx.inputs().brain_mask]),
        other => panic!("expected MissingInputs, got {other:?}"),
    }
    assert!(!fx.output_dir().exists());
}

#[test]
fn every_missing_file_is_listed_together() {
    let fx = ParticipantFixture::new("01");
    fx.remove(&fx.inputs().pet);
    fx.remove(&fx.inputs().anat_to_template);
    fx.remove(&fx.template());

    let err = build_context(
        &RealFileSystem,
        &fx.request(2, SmoothingVariant::Without),
        &PipelineConfig::default(),
    )
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("sub-01_pet.nii.gz"), "{msg}");
    assert!(msg.contains("from-T1w_to-MNI152NLin2009cAsym"), "{msg}");
    assert!(msg.contains("tpl-MNI152NLin2009cAsym_res-02_T1w.nii.gz"), "{msg}");
}

#[test]
fn configured_template_path_skips_the_cache() {
    let fx = ParticipantFixture::new("01");
    let mut config = PipelineConfig::default();
    config.template.path = Some(fx.inputs().t1w);

    let ctx = build_context(&RealFileSystem, &fx.request(1, SmoothingVariant::Without), &config)
        .unwrap();
    assert_eq!(ctx.template, fx.inputs().t1w);
}

#[test]
fn label_with_path_characters_is_rejected() {
    let fx = ParticipantFixture::new("01");
    let mut request = fx.request(1, SmoothingVariant::Without);
    request.participant_label = "sub-01/../02".into();

    let err = build_context(&RealFileSystem, &request, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidLabel(_)));
}
