//! Addon system settings.
//!
//! Plain data with production defaults. The host fills it from its own
//! configuration layer; this crate does not read config files itself.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Version reported by the host when none is configured.
pub const DEFAULT_HOST_VERSION: &str = "3.0.0";

/// Settings for discovery, loading and compatibility checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddonSystemConfig {
    /// Root directory holding one subdirectory per addon bundle.
    pub addons_path: PathBuf,
    /// Name of the subdirectory (under `addons_path`) for per-addon config.
    pub config_dir_name: String,
    /// Semantic version of the running host.
    pub host_version: String,
    /// Extension of an addon's source unit (`<module>.<ext>`).
    pub module_extension: String,
    /// Directory names under `addons_path` that are never bundles.
    pub skip_dirs: Vec<String>,
    /// Also require bundles to pass semantic manifest validation.
    pub strict_validation: bool,
}

impl Default for AddonSystemConfig {
    fn default() -> Self {
        Self {
            addons_path: PathBuf::from("addons"),
            config_dir_name: "config".to_owned(),
            host_version: DEFAULT_HOST_VERSION.to_owned(),
            module_extension: "rs".to_owned(),
            skip_dirs: vec![
                ".git".to_owned(),
                "__pycache__".to_owned(),
                "target".to_owned(),
            ],
            strict_validation: false,
        }
    }
}

impl AddonSystemConfig {
    /// Settings rooted at `addons_path`, defaults elsewhere.
    #[must_use]
    pub fn new(addons_path: impl Into<PathBuf>) -> Self {
        Self {
            addons_path: addons_path.into(),
            ..Self::default()
        }
    }

    /// Set the host version used for compatibility checks.
    #[must_use]
    pub fn with_host_version(mut self, version: impl Into<String>) -> Self {
        self.host_version = version.into();
        self
    }

    /// Enable or disable semantic manifest validation during scans.
    #[must_use]
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    /// Directory holding per-addon config files.
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.addons_path.join(&self.config_dir_name)
    }

    /// Whether `dir_name` must be skipped during discovery.
    #[must_use]
    pub fn is_skipped(&self, dir_name: &str) -> bool {
        dir_name == self.config_dir_name || self.skip_dirs.iter().any(|d| d == dir_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AddonSystemConfig::default();
        assert_eq!(cfg.host_version, DEFAULT_HOST_VERSION);
        assert_eq!(cfg.config_dir(), PathBuf::from("addons/config"));
        assert!(!cfg.strict_validation);
    }

    #[test]
    fn test_skipped_dirs() {
        let cfg = AddonSystemConfig::new("/opt/addons");
        assert!(cfg.is_skipped("config"));
        assert!(cfg.is_skipped(".git"));
        assert!(cfg.is_skipped("__pycache__"));
        assert!(!cfg.is_skipped("email_reports"));
    }

    #[test]
    fn test_builders() {
        let cfg = AddonSystemConfig::new("x")
            .with_host_version("1.5.0")
            .with_strict_validation(true);
        assert_eq!(cfg.host_version, "1.5.0");
        assert!(cfg.strict_validation);
    }
}
