// src/errors.rs

//! Crate-wide error types.
//!
//! - [`PipelineError`] is what every fallible public operation returns.
//! - [`GraphError`] covers mistakes in the graph definition itself.
//! - [`ToolFailure`] carries the diagnostics of one failed external tool run.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid participant label '{0}': expected letters and digits only")]
    InvalidLabel(String),

    #[error("The following files are missing: {}", join_paths(.0))]
    MissingInputs(Vec<PathBuf>),

    #[error("Transform chain has {transforms} transform(s) but {flags} invert flag(s)")]
    TransformChainMismatch { transforms: usize, flags: usize },

    #[error("Internal error in pipeline graph: {0}")]
    Graph(#[from] GraphError),

    #[error("{}", join_failures(.0))]
    NodesFailed(Vec<NodeFailure>),

    #[error("Pipeline interrupted before all nodes completed")]
    Interrupted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors in the graph definition. These are programming errors in the
/// pipeline wiring, never caused by user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node '{0}' is declared twice")]
    DuplicateNode(String),

    #[error("node '{node}' references node '{target}' which has not been declared")]
    UnknownNode { node: String, target: String },

    #[error("node '{node}' references output slot '{slot}' which node '{target}' does not declare")]
    UnknownOutputSlot {
        node: String,
        target: String,
        slot: String,
    },

    #[error("node '{node}' binds input slot '{slot}' which adapter '{adapter}' does not declare")]
    UnknownInputSlot {
        node: String,
        adapter: String,
        slot: String,
    },

    #[error("node '{node}' leaves required input slot '{slot}' unbound")]
    MissingBinding { node: String, slot: String },

    #[error("input slot '{slot}' of node '{node}' expects a {expected} binding")]
    BindingKind {
        node: String,
        slot: String,
        expected: &'static str,
    },

    #[error("graph output '{0}' is declared twice")]
    DuplicateOutput(String),

    #[error("cycle detected in pipeline graph involving node '{0}'")]
    Cycle(String),
}

/// Why an external tool run was considered failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// A required input file did not exist; the process was never spawned.
    MissingInput(PathBuf),
    /// The adapter could not build a command line from the resolved inputs.
    Invocation(String),
    /// The process could not be spawned or waited on.
    Spawn(String),
    /// The process exited with a non-zero status.
    NonZeroExit(i32),
    /// The process was terminated by a signal.
    Terminated,
    /// The process exited cleanly but wrote to stderr under a strict policy.
    StderrNotEmpty,
    /// The process exited cleanly but a declared output is missing.
    MissingOutput { slot: String, path: PathBuf },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MissingInput(path) => {
                write!(f, "required input {} does not exist", path.display())
            }
            FailureReason::Invocation(msg) => write!(f, "could not build invocation: {msg}"),
            FailureReason::Spawn(msg) => write!(f, "could not run process: {msg}"),
            FailureReason::NonZeroExit(code) => write!(f, "exited with status {code}"),
            FailureReason::Terminated => write!(f, "was terminated by a signal"),
            FailureReason::StderrNotEmpty => {
                write!(f, "exited successfully but reported errors on stderr")
            }
            FailureReason::MissingOutput { slot, path } => write!(
                f,
                "did not produce output '{slot}' at {}",
                path.display()
            ),
        }
    }
}

/// Diagnostics for one failed external tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub program: String,
    pub command_line: String,
    pub reason: FailureReason,
    pub stdout: String,
    pub stderr: String,
}

impl ToolFailure {
    pub fn new(
        program: impl Into<String>,
        command_line: impl Into<String>,
        reason: FailureReason,
    ) -> Self {
        Self {
            program: program.into(),
            command_line: command_line.into(),
            reason,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn with_output(mut self, stdout: String, stderr: String) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.reason)?;
        write!(f, "\n  command: {}", self.command_line)?;
        if !self.stdout.trim().is_empty() {
            write!(f, "\n  stdout:\n{}", indent(&self.stdout))?;
        }
        if !self.stderr.trim().is_empty() {
            write!(f, "\n  stderr:\n{}", indent(&self.stderr))?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolFailure {}

/// A tool failure attributed to the graph node that ran it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub node: String,
    pub failure: ToolFailure,
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node '{}' failed: {}", self.node, self.failure)
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_failures(failures: &[NodeFailure]) -> String {
    let mut out = format!("{} pipeline node(s) failed", failures.len());
    for failure in failures {
        out.push('\n');
        out.push_str(&failure.to_string());
    }
    out
}

fn indent(text: &str) -> String {
    text.trim_end()
        .lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_inputs_lists_every_path() {
        let err = PipelineError::MissingInputs(vec![
            PathBuf::from("/a/mask.nii.gz"),
            PathBuf::from("/b/pet.nii.gz"),
        ]);
        assert_eq!(
            err.to_string(),
            "The following files are missing: /a/mask.nii.gz, /b/pet.nii.gz"
        );
    }

    #[test]
    fn node_failure_carries_captured_streams() {
        let failure =
            ToolFailure::new("hd-bet", "hd-bet -i in.nii.gz", FailureReason::NonZeroExit(2))
                .with_output("loading model\n".into(), "CUDA not found\n".into());
        let err = PipelineError::NodesFailed(vec![NodeFailure {
            node: "skull_strip".into(),
            failure,
        }]);
        let msg = err.to_string();
        assert!(msg.contains("node 'skull_strip' failed"));
        assert!(msg.contains("exited with status 2"));
        assert!(msg.contains("    CUDA not found"));
        assert!(msg.contains("    loading model"));
    }
}
