//! A tool adapter with generic slots, for graphs whose shape is what matters.

use std::path::Path;

use anyhow::Result;

use petbrainprep::adapters::{InputSlot, Invocation, ResolvedInputs, ToolAdapter};

/// Number of optional file inputs a [`StubTool`] accepts.
pub const STUB_INPUTS: usize = 8;

static SLOTS: [InputSlot; STUB_INPUTS] = [
    InputSlot::file("in0").optional(),
    InputSlot::file("in1").optional(),
    InputSlot::file("in2").optional(),
    InputSlot::file("in3").optional(),
    InputSlot::file("in4").optional(),
    InputSlot::file("in5").optional(),
    InputSlot::file("in6").optional(),
    InputSlot::file("in7").optional(),
];

/// Input slot name for the `i`-th upstream of a stub node.
pub fn stub_slot(i: usize) -> &'static str {
    SLOTS[i].name
}

/// Runs `stub`, reads any bound inputs and writes `out.txt`.
#[derive(Debug, Default)]
pub struct StubTool;

impl ToolAdapter for StubTool {
    fn program(&self) -> &'static str {
        "stub"
    }

    fn input_slots(&self) -> &'static [InputSlot] {
        &SLOTS
    }

    fn output_slots(&self) -> &'static [&'static str] {
        &["out"]
    }

    fn invocation(&self, inputs: &ResolvedInputs, node_dir: &Path) -> Result<Invocation> {
        let mut inv = Invocation::new(self.program(), node_dir);
        for slot in &SLOTS {
            if let Ok(path) = inputs.file(slot.name) {
                inv.path_arg(path).input(path);
            }
        }
        inv.output("out", node_dir.join("out.txt"));
        Ok(inv)
    }
}
