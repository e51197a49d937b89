//! Prelude module - commonly used types for convenient import.
//!
//! Addon crates usually only need:
//!
//! ```rust
//! use dataconta_addons::prelude::*;
//! ```

// Errors
pub use crate::{AddonError, AddonResult};

// Contract
pub use crate::{
    ActionParams, ActionTable, Addon, AddonContext, AddonManifest, AddonModule, AddonType,
    ConfigMap, action_handler,
};

// Host side
pub use crate::{AddonCatalog, AddonManager, AddonSystem, AddonSystemConfig, HostServices};
