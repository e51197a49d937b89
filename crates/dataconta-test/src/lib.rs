//! DataConta Test - Shared test utilities for the addon system.
//!
//! Provides bundle builders, mock addons and host callbacks that record
//! what addons asked the host to do.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! dataconta-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use dataconta_test::{BundleBuilder, test_manager};
//!
//! #[test]
//! fn test_enable() {
//!     let dir = tempfile::TempDir::new().unwrap();
//!     BundleBuilder::new("hello_addon").write(dir.path());
//!     let manager = test_manager(dir.path(), "1.5.0");
//!     manager.scan();
//!     assert!(manager.enable("hello_addon"));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod bundle;
pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use bundle::*;
pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
