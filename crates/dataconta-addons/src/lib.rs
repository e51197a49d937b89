//! Addon plugin system for the DataConta host.
//!
//! Lets self-contained addon bundles extend the host's menus and behavior
//! without touching host code:
//!
//! - [`AddonManifest`]: Declarative description of a bundle (`manifest.json`)
//! - [`Addon`]: Lifecycle contract every addon implements
//! - [`AddonContext`] / [`HostServices`]: What the host exposes to addons
//! - [`AddonRepository`]: Discovery, validation and per-addon config storage
//! - [`AddonLoader`]: Resolves `module.TypeName` entry points to constructors
//! - [`AddonRegistry`]: Loaded instances and action dispatch
//! - [`AddonManager`]: Orchestrates scan, load, enable, disable and unload
//! - [`AddonMenuIntegration`]: Namespaced addon menus next to the host menu
//!
//! # Lifecycle
//!
//! ```text
//! scan -> load (validate, resolve, construct, register) -> enable (initialize)
//!      -> execute actions -> disable (shutdown) -> unload
//! ```
//!
//! Host-facing operations never propagate addon failures. Errors and panics
//! raised by addon code are logged and reported as `false` or `None`.
//!
//! # Entry points
//!
//! Addons are compiled into the host. Each bundle module registers an
//! [`AddonModule`] in an [`AddonCatalog`]; the bundle directory still
//! carries the manifest and a source unit named after the module, and the
//! loader refuses bundles whose source unit is missing.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod addon;
pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod menu;
pub mod prelude;
pub mod registry;
pub mod repository;
pub mod system;
pub mod validate;
pub mod version;

pub use addon::{
    ActionHandler, ActionParams, ActionTable, Addon, AddonInstance, AddonStatus, SharedAddon,
    action_handler, lock_addon,
};
pub use config::{AddonSystemConfig, DEFAULT_HOST_VERSION};
pub use context::{
    AddonContext, AddonLogger, ConfigMap, ExportService, FileStorage, HostCallbacks, HostHandle,
    HostServices, KpiService, LoggingCallbacks,
};
pub use error::{AddonError, AddonResult};
pub use loader::{
    ADDON_CONTRACT_VERSION, AddonCatalog, AddonClass, AddonConstructor, AddonLoader, AddonModule,
    CatalogLoader, ModuleInit,
};
pub use manager::{AddonInfo, AddonManager, InfoStatus, SystemInfo};
pub use manifest::{AddonManifest, AddonType, MANIFEST_FILE_NAME, MenuContribution};
pub use menu::{
    ActionRoute, AddonMenuIntegration, AddonMenuStats, MenuAction, MenuActionKind, MenuCategory,
    MenuConfig, MenuItem,
};
pub use registry::AddonRegistry;
pub use repository::{AddonRepository, FileSystemRepository, load_manifest};
pub use system::AddonSystem;
pub use validate::{ValidationReport, validate_bundle, validate_manifest, validate_value};
pub use version::{check_compatibility, parse_version};
