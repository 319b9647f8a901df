//! On-disk participant layouts in a temporary directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use petbrainprep::inputs::{ParticipantInputs, RunRequest};
use petbrainprep::pipeline::SmoothingVariant;
use petbrainprep::template::template_path;

pub const TEMPLATE: &str = "MNI152NLin2009cAsym";

/// A BIDS dataset, anatomical derivatives and a TemplateFlow cache for one
/// participant, with every input present.
pub struct ParticipantFixture {
    root: TempDir,
    label: String,
}

impl ParticipantFixture {
    /// All inputs for `sub-<label>`, with a 2 mm isotropic PET image.
    pub fn new(label: &str) -> Self {
        Self::with_pet_spacing(label, [2.0, 2.0, 2.0])
    }

    pub fn with_pet_spacing(label: &str, spacing: [f32; 3]) -> Self {
        let fixture = Self {
            root: tempfile::tempdir().unwrap(),
            label: label.to_string(),
        };
        let inputs = fixture.inputs();

        write_file(&inputs.pet, &gzip(&nifti_header(spacing)));
        write_file(&inputs.t1w, &gzip(&nifti_header([1.0, 1.0, 1.0])));
        write_file(&inputs.brain_mask, &gzip(&nifti_header([1.0, 1.0, 1.0])));
        write_file(&inputs.anat_to_template, b"HDF");
        write_file(&fixture.template(), &gzip(&nifti_header([2.0, 2.0, 2.0])));
        fixture
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn bids_dir(&self) -> PathBuf {
        self.root().join("bids")
    }

    pub fn anat_dir(&self) -> PathBuf {
        self.root().join("derivatives").join("anat")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    pub fn templateflow_home(&self) -> PathBuf {
        self.root().join("templateflow")
    }

    pub fn template(&self) -> PathBuf {
        template_path(&self.templateflow_home(), TEMPLATE, 2)
    }

    pub fn inputs(&self) -> ParticipantInputs {
        ParticipantInputs::locate(&self.bids_dir(), &self.anat_dir(), &self.label, TEMPLATE)
    }

    /// Delete one of the fixture's files.
    pub fn remove(&self, path: &Path) {
        std::fs::remove_file(path).unwrap();
    }

    pub fn request(&self, nprocs: usize, smoothing: SmoothingVariant) -> RunRequest {
        RunRequest {
            bids_dir: self.bids_dir(),
            output_dir: self.output_dir(),
            anat_dir: self.anat_dir(),
            participant_label: format!("sub-{}", self.label),
            work_dir: None,
            nprocs,
            smoothing,
            templateflow_home: self.templateflow_home(),
        }
    }
}

fn write_file(path: &Path, contents: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

const HEADER_SIZE: usize = 348;

/// A little-endian NIfTI-1 header of a 1x1x1 uint8 volume with no
/// qform/sform, so the voxel spacing comes from `pixdim`.
pub fn nifti_header(spacing: [f32; 3]) -> Vec<u8> {
    let mut b = vec![0u8; HEADER_SIZE];
    b[0..4].copy_from_slice(&(HEADER_SIZE as i32).to_le_bytes());
    for (i, d) in [3i16, 1, 1, 1].iter().enumerate() {
        b[40 + 2 * i..42 + 2 * i].copy_from_slice(&d.to_le_bytes());
    }
    // datatype uint8, bitpix 8
    b[70..72].copy_from_slice(&2i16.to_le_bytes());
    b[72..74].copy_from_slice(&8i16.to_le_bytes());
    for (i, v) in [1.0f32, spacing[0], spacing[1], spacing[2]].iter().enumerate() {
        b[76 + 4 * i..80 + 4 * i].copy_from_slice(&v.to_le_bytes());
    }
    b[108..112].copy_from_slice(&352f32.to_le_bytes());
    b[344..348].copy_from_slice(b"n+1\0");
    b
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap()
}
