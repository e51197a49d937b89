//! Addon error types.

use std::path::PathBuf;

/// Errors from addon operations.
///
/// These stay inside the addon system. Host-facing operations on the
/// [`AddonManager`](crate::AddonManager), the [`AddonRegistry`](crate::AddonRegistry)
/// and the menu layer convert them into `bool`/`Option` results after logging.
#[derive(Debug, thiserror::Error)]
pub enum AddonError {
    /// Failed to read or parse a manifest file.
    #[error("manifest parse error in {path}: {message}")]
    ManifestParseError {
        /// Path to the manifest file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// The manifest parsed but violates a structural rule.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// No addon with this name has been discovered.
    #[error("addon not found: {0}")]
    NotFound(String),

    /// The addon declares host version bounds that exclude the running host.
    #[error("addon {name} is incompatible with host {host_version}: {reason}")]
    Incompatible {
        /// Addon name.
        name: String,
        /// Running host version.
        host_version: String,
        /// Which bound failed, or which version string was malformed.
        reason: String,
    },

    /// The entry point does not split into `module.TypeName`.
    #[error("invalid entry point '{0}': expected exactly two dot-separated components")]
    InvalidEntryPoint(String),

    /// The bundle has no source unit for the entry point module.
    #[error("module '{module}' not found in {location}")]
    ModuleNotFound {
        /// Module reference from the entry point.
        module: String,
        /// Bundle location.
        location: PathBuf,
    },

    /// The module loaded but does not export the requested type.
    #[error("type '{type_name}' not exported by module '{module}'")]
    TypeNotFound {
        /// Module reference from the entry point.
        module: String,
        /// Requested type name.
        type_name: String,
    },

    /// The resolved type does not satisfy the addon contract.
    #[error("{0} does not satisfy the addon contract")]
    ContractViolation(String),

    /// The bundle could not be turned into a live addon.
    #[error("addon load failed: {name} - {message}")]
    LoadFailed {
        /// Addon name.
        name: String,
        /// Failure reason.
        message: String,
    },

    /// Addon construction failed.
    #[error("failed to construct addon {name}: {message}")]
    ConstructionFailed {
        /// Addon or type name.
        name: String,
        /// Failure reason.
        message: String,
    },

    /// `initialize` or `shutdown` failed.
    #[error("addon {name} failed during {operation}: {message}")]
    Lifecycle {
        /// Addon name.
        name: String,
        /// Lifecycle operation (`initialize`, `shutdown`).
        operation: &'static str,
        /// Failure reason.
        message: String,
    },

    /// The addon has no handler for the requested action.
    #[error("addon {addon} has no action '{action}'")]
    UnknownAction {
        /// Addon name.
        addon: String,
        /// Requested action.
        action: String,
    },

    /// The addon is registered but not active.
    #[error("addon {0} is not active")]
    Inactive(String),

    /// Addon code panicked.
    #[error("addon {name} panicked during {operation}")]
    Panicked {
        /// Addon name.
        name: String,
        /// Operation in progress when the panic happened.
        operation: String,
    },

    /// An action handler reported a failure.
    #[error("action failed: {0}")]
    ActionFailed(String),

    /// Per-addon configuration could not be read or written.
    #[error("config error for addon {name}: {message}")]
    Config {
        /// Addon name.
        name: String,
        /// Failure reason.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for addon operations.
pub type AddonResult<T> = Result<T, AddonError>;
