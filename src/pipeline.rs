// src/pipeline.rs

//! The PET preprocessing graph.
//!
//! ```text
//! crop_image -> skull_strip -> coreg_first_pass -> apply_coreg_first_pass
//!                                    |                      |
//!                                    |              coreg_second_pass
//!                                    |                 /          \
//!                                    +------> apply_final_coreg  apply_coreg_and_norm
//!                                                                      |
//!                                                               [fwhm_smoothing]
//! ```
//!
//! The reference resampling pre-step is a separate one-node graph, see
//! [`reference_graph`].

use std::sync::Arc;

use tracing::debug;

use crate::adapters::registration::CenterInit;
use crate::adapters::{
    ApplyTransforms, Autobox, HdBet, Registration, Resample, Smooth, SynthStrip, ToolAdapter,
};
use crate::config::PipelineConfig;
use crate::dag::{GraphBuilder, InputBinding, PipelineGraph, TransformChain, TransformSource};
use crate::errors::Result;
use crate::inputs::ParticipantContext;
use crate::sink::SinkCategory;
use crate::types::SkullStripTool;

pub const CROP_IMAGE: &str = "crop_image";
pub const SKULL_STRIP: &str = "skull_strip";
pub const COREG_FIRST_PASS: &str = "coreg_first_pass";
pub const APPLY_COREG_FIRST_PASS: &str = "apply_coreg_first_pass";
pub const COREG_SECOND_PASS: &str = "coreg_second_pass";
pub const APPLY_FINAL_COREG: &str = "apply_final_coreg";
pub const APPLY_COREG_AND_NORM: &str = "apply_coreg_and_norm";
pub const FWHM_SMOOTHING: &str = "fwhm_smoothing";
pub const RESAMPLE_REFERENCE: &str = "resample_reference";

pub const PET_TEMPLATE_SPACE: &str = "pet_template_space";
pub const PET_NATIVE_SPACE: &str = "pet_native_space";
pub const FIRST_PASS_TRANSFORM: &str = "first_pass_transform";
pub const SECOND_PASS_TRANSFORM: &str = "second_pass_transform";
pub const PET_SMOOTHED: &str = "pet_smoothed";

/// Registration output prefixes.
pub const FIRST_PASS_PREFIX: &str = "petmask2anatmask";
pub const SECOND_PASS_PREFIX: &str = "pet2anat";

/// Whether the template-space image is smoothed. Decided once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothingVariant {
    Without,
    With { fwhm: f64 },
}

impl SmoothingVariant {
    pub fn from_fwhm(fwhm: Option<f64>) -> Self {
        match fwhm {
            Some(fwhm) => SmoothingVariant::With { fwhm },
            None => SmoothingVariant::Without,
        }
    }
}

fn skull_stripper(config: &PipelineConfig, nprocs: usize) -> Arc<dyn ToolAdapter> {
    match config.skull_strip.tool {
        SkullStripTool::HdBet => Arc::new(HdBet::from_config(&config.skull_strip, nprocs)),
        SkullStripTool::SynthStrip => Arc::new(SynthStrip::from_config(&config.skull_strip)),
    }
}

/// Build the preprocessing graph for one participant.
pub fn build_pipeline(
    ctx: &ParticipantContext,
    config: &PipelineConfig,
    variant: SmoothingVariant,
    nprocs: usize,
) -> Result<PipelineGraph> {
    let mut b = GraphBuilder::new();
    let pet = InputBinding::Path(ctx.inputs.pet.clone());
    let apply = Arc::new(ApplyTransforms::from_config(&config.apply_transforms));

    let crop = b.add_node(
        CROP_IMAGE,
        Arc::new(Autobox::from_config(&config.crop, config.output_type)),
        [("in_file", pet.clone())],
    )?;

    let strip = b.add_node(
        SKULL_STRIP,
        skull_stripper(config, nprocs),
        [("in_file", InputBinding::from(crop.output("out_file")))],
    )?;

    let first = b.add_node(
        COREG_FIRST_PASS,
        Arc::new(
            Registration::new(FIRST_PASS_PREFIX, config.registration.clone(), nprocs)
                .with_initial_moving(CenterInit::Geometry),
        ),
        [
            ("fixed_image", InputBinding::Path(ctx.inputs.brain_mask.clone())),
            ("moving_image", InputBinding::from(strip.output("mask_file"))),
        ],
    )?;
    let first_xfm = TransformSource::from(first.output("composite_transform"));

    let apply_first = b.add_node(
        APPLY_COREG_FIRST_PASS,
        apply.clone(),
        [
            ("input_image", pet.clone()),
            ("reference_image", InputBinding::Path(ctx.template.clone())),
            (
                "transforms",
                TransformChain::new(vec![first_xfm.clone()], vec![false])?.into(),
            ),
        ],
    )?;

    let second = b.add_node(
        COREG_SECOND_PASS,
        Arc::new(Registration::new(
            SECOND_PASS_PREFIX,
            config.registration.clone(),
            nprocs,
        )),
        [
            ("fixed_image", InputBinding::Path(ctx.inputs.t1w.clone())),
            ("moving_image", InputBinding::from(apply_first.output("output_image"))),
        ],
    )?;
    let second_xfm = TransformSource::from(second.output("composite_transform"));

    let native = b.add_node(
        APPLY_FINAL_COREG,
        apply.clone(),
        [
            ("input_image", pet.clone()),
            ("reference_image", InputBinding::Path(ctx.t1w_resampled.clone())),
            (
                "transforms",
                TransformChain::new(
                    vec![second_xfm.clone(), first_xfm.clone()],
                    vec![false, false],
                )?
                .into(),
            ),
        ],
    )?;

    let normalised = b.add_node(
        APPLY_COREG_AND_NORM,
        apply,
        [
            ("input_image", pet),
            ("reference_image", InputBinding::Path(ctx.template.clone())),
            (
                "transforms",
                TransformChain::new(
                    vec![
                        TransformSource::File(ctx.inputs.anat_to_template.clone()),
                        second_xfm,
                        first_xfm,
                    ],
                    vec![false, false, false],
                )?
                .into(),
            ),
        ],
    )?;

    b.terminal(PET_TEMPLATE_SPACE, normalised.output("output_image"))?;
    b.terminal(PET_NATIVE_SPACE, native.output("output_image"))?;
    b.terminal(FIRST_PASS_TRANSFORM, first.output("composite_transform"))?;
    b.terminal(SECOND_PASS_TRANSFORM, second.output("composite_transform"))?;

    b.sink(crop.output("out_file"), SinkCategory::Crop)?;
    b.sink(strip.output("out_file"), SinkCategory::SkullStrip)?;
    b.sink(first.output("warped_image"), SinkCategory::Coreg)?;
    b.sink(second.output("warped_image"), SinkCategory::Coreg)?;
    b.sink(native.output("output_image"), SinkCategory::Coreg)?;
    b.sink(first.output("composite_transform"), SinkCategory::Transforms)?;
    b.sink(second.output("composite_transform"), SinkCategory::Transforms)?;
    b.sink(normalised.output("output_image"), SinkCategory::Norm)?;

    if let SmoothingVariant::With { fwhm } = variant {
        let smooth = b.add_node(
            FWHM_SMOOTHING,
            Arc::new(Smooth::new(fwhm, config.output_type)),
            [("in_file", InputBinding::from(normalised.output("output_image")))],
        )?;
        b.terminal(PET_SMOOTHED, smooth.output("smoothed_file"))?;
        b.sink(smooth.output("smoothed_file"), SinkCategory::Smooth)?;
    }

    let graph = b.build()?;
    debug!(nodes = graph.len(), ?variant, "pipeline graph built");
    Ok(graph)
}

/// One-node graph resampling the anatomical reference to the PET voxel
/// spacing, written to `ctx.t1w_resampled`.
pub fn reference_graph(
    ctx: &ParticipantContext,
    config: &PipelineConfig,
    spacing: [f64; 3],
) -> Result<PipelineGraph> {
    let mut b = GraphBuilder::new();
    let resample = Resample {
        spacing,
        interpolation: config.resample.interpolation,
        output: ctx.t1w_resampled.clone(),
    };
    let node = b.add_node(
        RESAMPLE_REFERENCE,
        Arc::new(resample),
        [("input_image", InputBinding::Path(ctx.inputs.t1w.clone()))],
    )?;
    b.sink(node.output("output_image"), SinkCategory::Coreg)?;
    Ok(b.build()?)
}
