// src/adapters/mod.rs

//! External tool adapters.
//!
//! Each adapter wraps one third-party binary. It declares a fixed set of
//! input and output slots, and turns resolved input paths into an exact
//! [`Invocation`]: program, arguments, environment and the output paths the
//! tool is expected to write. Running the invocation is the executor's job
//! (see [`crate::exec::task_runner`]).
//!
//! - [`autobox`]: AFNI `3dAutobox` cropping.
//! - [`hdbet`] / [`synthstrip`]: skull stripping.
//! - [`registration`]: `antsRegistration`.
//! - [`apply_transforms`]: `antsApplyTransforms`.
//! - [`smooth`]: FSL `fslmaths` Gaussian smoothing.
//! - [`resample`]: ANTs `ResampleImage`, used before the graph runs.
//! - [`naming`]: derived output file names.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

pub mod apply_transforms;
pub mod autobox;
pub mod hdbet;
pub mod naming;
pub mod registration;
pub mod resample;
pub mod smooth;
pub mod synthstrip;

pub use apply_transforms::ApplyTransforms;
pub use autobox::Autobox;
pub use hdbet::HdBet;
pub use registration::Registration;
pub use resample::Resample;
pub use smooth::Smooth;
pub use synthstrip::SynthStrip;

/// What kind of binding an input slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// A single file path.
    File,
    /// An ordered transform chain with one invert flag per transform.
    Transforms,
}

/// Declaration of one input slot of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSlot {
    pub name: &'static str,
    pub kind: SlotKind,
    pub required: bool,
}

impl InputSlot {
    pub const fn file(name: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::File,
            required: true,
        }
    }

    pub const fn transforms(name: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::Transforms,
            required: true,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// How output on stderr affects the success of a run.
///
/// Most tools log progress on stderr, so it is ignored by default. Tools that
/// only write to stderr when something went wrong (while still exiting 0) use
/// `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrPolicy {
    Ignore,
    Fail,
}

impl Default for StderrPolicy {
    fn default() -> Self {
        StderrPolicy::Ignore
    }
}

/// A concrete input value, after graph references have been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedValue {
    File(PathBuf),
    /// `(transform file, invert)` pairs, most recently computed first.
    Transforms(Vec<(PathBuf, bool)>),
}

/// Resolved values for every bound input slot of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedInputs {
    values: BTreeMap<String, ResolvedValue>,
}

impl ResolvedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: impl Into<String>, value: ResolvedValue) {
        self.values.insert(slot.into(), value);
    }

    pub fn with_file(mut self, slot: &str, path: impl Into<PathBuf>) -> Self {
        self.insert(slot, ResolvedValue::File(path.into()));
        self
    }

    pub fn with_transforms(mut self, slot: &str, transforms: Vec<(PathBuf, bool)>) -> Self {
        self.insert(slot, ResolvedValue::Transforms(transforms));
        self
    }

    pub fn file(&self, slot: &str) -> Result<&Path> {
        match self.values.get(slot) {
            Some(ResolvedValue::File(path)) => Ok(path),
            Some(ResolvedValue::Transforms(_)) => {
                Err(anyhow!("input slot '{slot}' holds transforms, not a file"))
            }
            None => Err(anyhow!("input slot '{slot}' is not bound")),
        }
    }

    pub fn transforms(&self, slot: &str) -> Result<&[(PathBuf, bool)]> {
        match self.values.get(slot) {
            Some(ResolvedValue::Transforms(list)) => Ok(list),
            Some(ResolvedValue::File(_)) => {
                Err(anyhow!("input slot '{slot}' holds a file, not transforms"))
            }
            None => Err(anyhow!("input slot '{slot}' is not bound")),
        }
    }

    /// Every file path referenced by the inputs, in slot order.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for value in self.values.values() {
            match value {
                ResolvedValue::File(path) => out.push(path.clone()),
                ResolvedValue::Transforms(list) => {
                    out.extend(list.iter().map(|(path, _)| path.clone()))
                }
            }
        }
        out
    }
}

/// Exact description of one external process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Directory the process runs in; also where it writes its outputs.
    pub working_dir: PathBuf,
    /// Files that must exist before the process is spawned.
    pub inputs: Vec<PathBuf>,
    /// Declared output slot -> path the tool writes.
    pub outputs: BTreeMap<String, PathBuf>,
    pub stderr_policy: StderrPolicy,
}

impl Invocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: working_dir.into(),
            inputs: Vec::new(),
            outputs: BTreeMap::new(),
            stderr_policy: StderrPolicy::Ignore,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(&mut self, path: &Path) -> &mut Self {
        self.args.push(path.display().to_string());
        self
    }

    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn input(&mut self, path: &Path) -> &mut Self {
        self.inputs.push(path.to_path_buf());
        self
    }

    pub fn output(&mut self, slot: &str, path: PathBuf) -> &mut Self {
        self.outputs.insert(slot.to_string(), path);
        self
    }

    /// Shell-like rendering, for logs and diagnostics only.
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                parts.push(format!("'{arg}'"));
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

/// One external tool, as seen by the graph builder and the executor.
pub trait ToolAdapter: Send + Sync + fmt::Debug {
    /// Name of the binary this adapter runs.
    fn program(&self) -> &'static str;

    fn input_slots(&self) -> &'static [InputSlot];

    fn output_slots(&self) -> &'static [&'static str];

    fn stderr_policy(&self) -> StderrPolicy {
        StderrPolicy::Ignore
    }

    /// Build the invocation for the given inputs. Outputs are written inside
    /// `node_dir`, which belongs to this node alone.
    fn invocation(&self, inputs: &ResolvedInputs, node_dir: &Path) -> Result<Invocation>;

    fn input_slot(&self, name: &str) -> Option<&'static InputSlot> {
        self.input_slots().iter().find(|slot| slot.name == name)
    }

    fn has_output(&self, name: &str) -> bool {
        self.output_slots().contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_quotes_arguments_with_spaces() {
        let mut inv = Invocation::new("fslmaths", "/work");
        inv.arg("/data/my pet.nii.gz").arg("-fmean");
        assert_eq!(inv.command_line(), "fslmaths '/data/my pet.nii.gz' -fmean");
    }

    #[test]
    fn resolved_inputs_reject_wrong_kind() {
        let inputs = ResolvedInputs::new()
            .with_file("in_file", "/a.nii.gz")
            .with_transforms("transforms", vec![(PathBuf::from("/t.h5"), false)]);

        assert_eq!(inputs.file("in_file").unwrap(), Path::new("/a.nii.gz"));
        assert!(inputs.file("transforms").is_err());
        assert!(inputs.transforms("in_file").is_err());
        assert!(inputs.file("missing").is_err());
        assert_eq!(
            inputs.paths(),
            vec![PathBuf::from("/a.nii.gz"), PathBuf::from("/t.h5")]
        );
    }
}
