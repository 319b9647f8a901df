// src/adapters/hdbet.rs

//! HD-BET brain extraction.
//!
//! The extracted brain is written to `<stem>_bet.<ext>` and HD-BET derives the
//! mask name from it: `<stem>_bet_mask.<ext>`.

use std::path::Path;

use anyhow::Result;

use crate::adapters::naming::derive_output;
use crate::adapters::{InputSlot, Invocation, ResolvedInputs, ToolAdapter};
use crate::config::SkullStripConfig;
use crate::types::{BetMode, Device};

const INPUTS: &[InputSlot] = &[InputSlot::file("in_file")];
const OUTPUTS: &[&str] = &["out_file", "mask_file"];

#[derive(Debug, Clone)]
pub struct HdBet {
    pub mode: BetMode,
    pub device: Device,
    /// CPU threads; 0 lets HD-BET use every core.
    pub num_threads: usize,
    pub tta: bool,
    pub postprocess: Option<bool>,
    pub save_mask: Option<bool>,
}

impl HdBet {
    pub fn from_config(cfg: &SkullStripConfig, num_threads: usize) -> Self {
        Self {
            mode: cfg.mode,
            device: cfg.device,
            num_threads,
            tta: cfg.tta,
            postprocess: cfg.postprocess,
            save_mask: cfg.save_mask,
        }
    }
}

impl ToolAdapter for HdBet {
    fn program(&self) -> &'static str {
        "hd-bet"
    }

    fn input_slots(&self) -> &'static [InputSlot] {
        INPUTS
    }

    fn output_slots(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    fn invocation(&self, inputs: &ResolvedInputs, node_dir: &Path) -> Result<Invocation> {
        let in_file = inputs.file("in_file")?;
        let out_file = derive_output(node_dir, in_file, "_bet");
        let mask_file = derive_output(node_dir, &out_file, "_mask");

        let mut inv = Invocation::new(self.program(), node_dir);
        inv.arg("-i")
            .path_arg(in_file)
            .arg("-o")
            .path_arg(&out_file)
            .arg("-mode")
            .arg(self.mode.to_string())
            .arg("-device")
            .arg(self.device.to_string())
            .arg("-threads")
            .arg(self.num_threads.to_string())
            .arg("-tta")
            .arg(flag(self.tta));
        if let Some(pp) = self.postprocess {
            inv.arg("-pp").arg(flag(pp));
        }
        if let Some(s) = self.save_mask {
            inv.arg("-s").arg(flag(s));
        }
        inv.input(in_file)
            .output("out_file", out_file)
            .output("mask_file", mask_file);
        Ok(inv)
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn derives_brain_and_mask_names() {
        let adapter = HdBet::from_config(&SkullStripConfig::default(), 4);
        let inputs = ResolvedInputs::new()
            .with_file("in_file", "/work/crop_image/sub-01_pet_autobox.nii.gz");
        let inv = adapter.invocation(&inputs, Path::new("/work/skull_strip")).unwrap();

        assert_eq!(
            inv.command_line(),
            "hd-bet -i /work/crop_image/sub-01_pet_autobox.nii.gz \
             -o /work/skull_strip/sub-01_pet_autobox_bet.nii.gz \
             -mode fast -device cpu -threads 4 -tta 0"
        );
        assert_eq!(
            inv.outputs["mask_file"],
            PathBuf::from("/work/skull_strip/sub-01_pet_autobox_bet_mask.nii.gz")
        );
    }

    #[test]
    fn optional_switches_are_rendered_when_set() {
        let cfg = SkullStripConfig {
            mode: BetMode::Accurate,
            device: Device::Gpu(1),
            postprocess: Some(false),
            save_mask: Some(true),
            ..SkullStripConfig::default()
        };
        let inv = HdBet::from_config(&cfg, 0)
            .invocation(
                &ResolvedInputs::new().with_file("in_file", "/in.nii.gz"),
                Path::new("/out"),
            )
            .unwrap();
        let line = inv.command_line();
        assert!(line.contains("-mode accurate -device 1"));
        assert!(line.ends_with("-pp 0 -s 1"));
    }
}
