// src/template.rs

//! Location of the standard-space template image in a TemplateFlow cache.

use std::path::{Path, PathBuf};

use crate::config::TemplateConfig;

/// Environment variable that overrides the TemplateFlow cache location.
pub const TEMPLATEFLOW_HOME_ENV: &str = "TEMPLATEFLOW_HOME";

/// `$TEMPLATEFLOW_HOME`, else `~/.cache/templateflow`.
pub fn templateflow_home() -> PathBuf {
    if let Some(home) = std::env::var_os(TEMPLATEFLOW_HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache")
        .join("templateflow")
}

/// `<home>/tpl-<name>/tpl-<name>_res-<NN>_T1w.nii.gz`.
pub fn template_path(home: &Path, name: &str, resolution: u8) -> PathBuf {
    home.join(format!("tpl-{name}"))
        .join(format!("tpl-{name}_res-{resolution:02}_T1w.nii.gz"))
}

/// The template image a run will use: the configured path, or the
/// TemplateFlow cache entry. Existence is checked by the caller.
pub fn resolve_template(cfg: &TemplateConfig, home: &Path) -> PathBuf {
    match &cfg.path {
        Some(path) => path.clone(),
        None => template_path(home, &cfg.name, cfg.resolution),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templateflow_layout() {
        assert_eq!(
            template_path(Path::new("/tf"), "MNI152NLin2009cAsym", 2),
            PathBuf::from("/tf/tpl-MNI152NLin2009cAsym/tpl-MNI152NLin2009cAsym_res-02_T1w.nii.gz")
        );
    }

    #[test]
    fn explicit_path_wins() {
        let cfg = TemplateConfig {
            path: Some(PathBuf::from("/data/my_template.nii.gz")),
            ..TemplateConfig::default()
        };
        assert_eq!(
            resolve_template(&cfg, Path::new("/tf")),
            PathBuf::from("/data/my_template.nii.gz")
        );
    }
}
