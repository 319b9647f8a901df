// src/lib.rs

pub mod adapters;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod inputs;
pub mod logging;
pub mod nifti;
pub mod pipeline;
pub mod sink;
pub mod template;
pub mod types;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, validate_fwhm, PipelineConfig};
use crate::dag::PipelineGraph;
use crate::engine::{plan, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::PipelineError;
use crate::exec::{ExecutorBackend, RealExecutorBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::inputs::{build_context, ParticipantContext, RunRequest};
use crate::nifti::read_voxel_spacing;
use crate::pipeline::{build_pipeline, reference_graph, SmoothingVariant};
use crate::sink::ArtifactSink;
use crate::template::templateflow_home;

/// File name of the graph export written next to the node directories.
pub const GRAPH_EXPORT: &str = "graph.dot";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - participant input resolution and graph construction
/// - runtime + executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config = load_and_validate(args.config.as_deref())?;
    let request = request_from_args(&args, &config)?;
    let fs = RealFileSystem;

    if args.dry_run {
        print_dry_run(&fs, &request, &config)?;
        return Ok(());
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = RealExecutorBackend::new(rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let mut runtime = Runtime::new(rt_rx, executor);
    let report = process_participant(&fs, &request, &config, &mut runtime).await?;

    for (name, path) in &report.outputs {
        println!("{name}: {}", path.display());
    }
    Ok(())
}

/// Turn parsed arguments into a [`RunRequest`].
///
/// `--fwhm` wins over `[smoothing].fwhm`; `--nprocs` defaults to the number
/// of available CPUs.
pub fn request_from_args(args: &CliArgs, config: &PipelineConfig) -> Result<RunRequest> {
    let fwhm = args.fwhm.or(config.smoothing.fwhm);
    if let Some(fwhm) = fwhm {
        validate_fwhm(fwhm)?;
    }

    let nprocs = match args.nprocs {
        Some(0) => {
            return Err(PipelineError::ConfigError("--nprocs must be at least 1".into()).into());
        }
        Some(n) => n,
        None => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    };

    Ok(RunRequest {
        bids_dir: args.bids_dir.clone(),
        output_dir: args.output_dir.clone(),
        anat_dir: args.anat_derivatives_dir.clone(),
        participant_label: args.participant_label.clone(),
        work_dir: args.work_dir.clone(),
        nprocs,
        smoothing: SmoothingVariant::from_fwhm(fwhm),
        templateflow_home: templateflow_home(),
    })
}

/// A participant's context and its main graph, ready to run or plan.
#[derive(Debug, Clone)]
pub struct PreparedParticipant {
    pub ctx: ParticipantContext,
    pub graph: Arc<PipelineGraph>,
}

/// Resolve inputs and build the main graph. Reads only; writes nothing.
pub fn prepare_participant(
    fs: &dyn FileSystem,
    request: &RunRequest,
    config: &PipelineConfig,
) -> errors::Result<PreparedParticipant> {
    let ctx = build_context(fs, request, config)?;
    let graph = build_pipeline(&ctx, config, request.smoothing, request.nprocs)?;
    Ok(PreparedParticipant {
        ctx,
        graph: Arc::new(graph),
    })
}

/// What one participant's run left behind.
#[derive(Debug, Clone)]
pub struct ParticipantReport {
    /// Terminal output name -> path in the work directory.
    pub outputs: BTreeMap<String, PathBuf>,
    /// Copies made under the participant's results directory.
    pub delivered: Vec<PathBuf>,
    pub graph_export: PathBuf,
}

/// Run the whole pipeline for one participant on `runtime`.
///
/// The anatomical reference is resampled to the PET voxel size first, as a
/// one-node graph on the same runtime; the main graph only starts once that
/// succeeded. Results are delivered after both graphs finished.
pub async fn process_participant<E: ExecutorBackend>(
    fs: &dyn FileSystem,
    request: &RunRequest,
    config: &PipelineConfig,
    runtime: &mut Runtime<E>,
) -> errors::Result<ParticipantReport> {
    let PreparedParticipant { ctx, graph } = prepare_participant(fs, request, config)?;

    let graph_export = ctx.work_dir.join(GRAPH_EXPORT);
    fs.write(&graph_export, graph.to_dot().as_bytes())?;
    debug!(path = %graph_export.display(), "graph exported");

    let spacing = read_voxel_spacing(fs, &ctx.inputs.pet)?;
    info!(participant = %ctx.subject(), ?spacing, "PET voxel spacing");
    let reference = Arc::new(reference_graph(&ctx, config, spacing)?);

    let options = RuntimeOptions {
        max_parallel: request.nprocs,
        node_root: ctx.work_dir.clone(),
    };

    let reference_report = runtime
        .run(CoreRuntime::new(reference.clone(), options.clone()))
        .await?;
    let report = runtime
        .run(CoreRuntime::new(graph.clone(), options))
        .await?;

    let sink = ArtifactSink::new(fs, &ctx.results_dir);
    let mut delivered = sink.deliver(&reference, &reference_report.artifacts)?;
    delivered.extend(sink.deliver(&graph, &report.artifacts)?);

    info!(
        participant = %ctx.subject(),
        outputs = report.outputs.len(),
        "participant finished"
    );
    Ok(ParticipantReport {
        outputs: report.outputs,
        delivered,
        graph_export,
    })
}

/// Dry-run output: every command line with its resolved paths.
fn print_dry_run(fs: &dyn FileSystem, request: &RunRequest, config: &PipelineConfig) -> Result<()> {
    let PreparedParticipant { ctx, graph } = prepare_participant(fs, request, config)?;
    let spacing = read_voxel_spacing(fs, &ctx.inputs.pet)?;
    let reference = reference_graph(&ctx, config, spacing)?;

    println!("petbrainprep dry-run for {}", ctx.subject());
    println!("  template = {}", ctx.template.display());
    println!("  work_dir = {}", ctx.work_dir.display());
    println!("  results_dir = {}", ctx.results_dir.display());
    println!("  nprocs = {}", request.nprocs);
    println!("  smoothing = {:?}", request.smoothing);
    println!();

    for g in [&reference, graph.as_ref()] {
        let planned = plan(g, &ctx.work_dir)?;
        for node in &planned.nodes {
            println!("  - {}", node.name);
            let deps = g.dependencies_of(&node.name);
            if !deps.is_empty() {
                println!("      after: {:?}", deps);
            }
            println!("      cmd: {}", node.invocation.command_line());
            for (slot, path) in &node.invocation.outputs {
                println!("      {slot}: {}", path.display());
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
