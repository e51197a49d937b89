#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for the DataConta host.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dataconta_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("Addons live in {}", resolved.config.addons.path.display());
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`DATACONTA_ADDONS_PATH`,
//!    `DATACONTA_HOST_VERSION`, `DATACONTA_LOG_LEVEL`, `DATACONTA_LOG_FORMAT`,
//!    `DATACONTA_MENU_FILE`)
//! 2. **Explicit file** (`--config <path>`)
//! 3. **User** (`<config dir>/dataconta/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! This crate has no dependencies on other internal DataConta crates.
//! Conversion to addon system and telemetry types happens at the
//! integration boundary.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit)
    }
}
