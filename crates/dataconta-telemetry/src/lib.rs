//! Logging setup for the DataConta host.
//!
//! # Example
//!
//! ```rust,no_run
//! use dataconta_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), dataconta_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("dataconta_addons=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("host started");
//! # Ok(())
//! # }
//! ```
//!
//! With the `config` feature, [`LogConfig::from_section`] builds a config
//! from the host's `[logging]` section.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

#[cfg(feature = "config")]
mod config_bridge;
mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
