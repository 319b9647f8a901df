// src/adapters/naming.rs

//! Output file names derived from input file names.
//!
//! The stem of a file is everything before the *first* dot and the extension
//! everything after it, so `sub-01_pet.nii.gz` has stem `sub-01_pet` and
//! extension `nii.gz`.

use std::path::{Component, Path, PathBuf};

/// Split a file name into `(stem, extension)` at the first dot.
pub fn split_name(path: &Path) -> (String, Option<String>) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match name.split_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem.to_string(), Some(ext.to_string())),
        Some((stem, _)) => (stem.to_string(), None),
        None => (name, None),
    }
}

/// `<dir>/<stem><suffix>.<ext>`, keeping the input's extension.
pub fn derive_output(dir: &Path, input: &Path, suffix: &str) -> PathBuf {
    let (stem, ext) = split_name(input);
    match ext {
        Some(ext) => dir.join(format!("{stem}{suffix}.{ext}")),
        None => dir.join(format!("{stem}{suffix}")),
    }
}

/// `<dir>/<stem><suffix>.<ext>` with an explicit extension.
pub fn derive_output_with_ext(dir: &Path, input: &Path, suffix: &str, ext: &str) -> PathBuf {
    let (stem, _) = split_name(input);
    dir.join(format!("{stem}{suffix}.{ext}"))
}

/// Express `path` relative to `base`. Both are expected to be absolute.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[common..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_uses_first_dot() {
        assert_eq!(
            split_name(Path::new("/x/sub-01_pet.nii.gz")),
            ("sub-01_pet".to_string(), Some("nii.gz".to_string()))
        );
        assert_eq!(split_name(Path::new("/x/noext")), ("noext".to_string(), None));
    }

    #[test]
    fn derive_output_appends_suffix_before_extension() {
        let out = derive_output(
            Path::new("/w/skull_strip"),
            Path::new("/w/crop/pet_autobox.nii.gz"),
            "_mask",
        );
        assert_eq!(out, PathBuf::from("/w/skull_strip/pet_autobox_mask.nii.gz"));
    }

    #[test]
    fn relative_to_walks_up_to_common_ancestor() {
        let rel = relative_to(
            Path::new("/work/sub-01/crop_image/pet_autobox.nii.gz"),
            Path::new("/work/sub-01/skull_strip"),
        );
        assert_eq!(rel, PathBuf::from("../crop_image/pet_autobox.nii.gz"));
        assert_eq!(relative_to(Path::new("/a/b"), Path::new("/a/b")), PathBuf::from("."));
    }
}
