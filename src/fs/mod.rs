// src/fs/mod.rs

//! Filesystem seam for the parts of a run that touch participant files
//! directly: input checks, the PET header read, the graph export and the
//! artifact sink. Tool processes write their own outputs and bypass it.

use std::fmt::Debug;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

pub trait FileSystem: Send + Sync + Debug {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;

    /// Write a whole file, creating parent directories.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    fn is_file(&self, path: &Path) -> bool;

    /// Copy a file, creating the destination's parent directories.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display())),
        _ => Ok(()),
    }
}

impl FileSystem for RealFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Box::new(file))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        ensure_parent(path)?;
        let mut file =
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        file.write_all(contents)
            .with_context(|| format!("writing {}", path.display()))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        ensure_parent(to)?;
        fs::copy(from, to)
            .with_context(|| format!("copying {} to {}", from.display(), to.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_creates_destination_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("node").join("pet_trans.nii.gz");
        RealFileSystem.write(&src, b"voxels").unwrap();

        let dest = tmp.path().join("out").join("sub-01").join("norm").join("pet_trans.nii.gz");
        RealFileSystem.copy(&src, &dest).unwrap();

        assert!(RealFileSystem.is_file(&dest));
        assert_eq!(std::fs::read(&dest).unwrap(), b"voxels");
    }
}
