use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level DataConta configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Addon system settings.
    pub addons: AddonsSection,
    /// Logging settings.
    pub logging: LoggingSection,
    /// Host menu settings.
    pub menu: MenuSection,
}

// ---------------------------------------------------------------------------
// AddonsSection
// ---------------------------------------------------------------------------

/// Where addons live and which host version they are checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AddonsSection {
    /// Root directory holding one subdirectory per addon bundle.
    pub path: PathBuf,
    /// Host version compared with each manifest's bounds.
    pub host_version: String,
    /// Exclude bundles whose manifest fails the semantic validator.
    pub strict_validation: bool,
    /// Extension of the source unit an entry point module must have.
    pub module_extension: String,
}

impl Default for AddonsSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("addons"),
            host_version: "3.0.0".to_owned(),
            strict_validation: false,
            module_extension: "rs".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["dataconta_addons=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// MenuSection
// ---------------------------------------------------------------------------

/// Host menu configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuSection {
    /// Menu definition file. Created with the default menu when missing.
    /// Relative paths resolve against the working directory.
    pub config_file: PathBuf,
}

impl Default for MenuSection {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("menu_config.json"),
        }
    }
}
