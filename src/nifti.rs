// src/nifti.rs

//! PET header access.
//!
//! Only what is needed to resample the anatomical reference to PET
//! resolution: the voxel-to-world affine, from which the voxel spacing is
//! taken as the absolute diagonal. Both plain and gzip-compressed files are
//! accepted.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use nifti::NiftiHeader;

use crate::fs::FileSystem;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read the header of a `.nii` or `.nii.gz` file.
pub fn read_header(fs: &dyn FileSystem, path: &Path) -> Result<NiftiHeader> {
    let mut reader = BufReader::new(fs.open_read(path)?);
    let is_gzip = reader
        .fill_buf()
        .with_context(|| format!("reading {}", path.display()))?
        .starts_with(&GZIP_MAGIC);

    let source: Box<dyn Read> = if is_gzip {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    };

    NiftiHeader::from_reader(source)
        .with_context(|| format!("parsing NIfTI header of {}", path.display()))
}

/// Voxel spacing in mm, as the absolute diagonal of the header affine.
pub fn voxel_spacing(header: &NiftiHeader) -> [f64; 3] {
    let affine = header.affine::<f64>();
    [affine[(0, 0)], affine[(1, 1)], affine[(2, 2)]].map(f64::abs)
}

pub fn read_voxel_spacing(fs: &dyn FileSystem, path: &Path) -> Result<[f64; 3]> {
    Ok(voxel_spacing(&read_header(fs, path)?))
}
