//! Addon system factory.
//!
//! Wires the file system repository, the catalog loader and the manager
//! together and hands the host a shared [`AddonManager`].

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::AddonSystemConfig;
use crate::context::HostServices;
use crate::error::AddonResult;
use crate::loader::{AddonCatalog, CatalogLoader};
use crate::manager::AddonManager;
use crate::repository::FileSystemRepository;

/// Entry point for hosts embedding the addon system.
#[derive(Debug, Clone, Copy)]
pub struct AddonSystem;

impl AddonSystem {
    /// Build a manager over `config.addons_path`, creating the directory if
    /// needed, and run an initial scan.
    ///
    /// The host's app config gets `version` and `addons_path` entries when
    /// it does not already carry them.
    ///
    /// # Errors
    ///
    /// Returns an error if the addons or config directory cannot be created.
    pub fn build(
        config: AddonSystemConfig,
        host: HostServices,
        catalog: AddonCatalog,
    ) -> AddonResult<Arc<AddonManager>> {
        let repository = FileSystemRepository::new(&config)?;
        let loader = CatalogLoader::new(catalog, &config.module_extension);

        let mut app_config = host.app_config().clone();
        app_config
            .entry("version")
            .or_insert_with(|| Value::String(config.host_version.clone()));
        app_config
            .entry("addons_path")
            .or_insert_with(|| Value::String(config.addons_path.display().to_string()));
        let host = host.with_app_config(app_config);

        info!(
            addons_path = %config.addons_path.display(),
            host_version = %config.host_version,
            "Initializing addon system"
        );

        let manager = AddonManager::new(config, Box::new(repository), Box::new(loader))
            .with_host(host);
        manager.scan();
        Ok(Arc::new(manager))
    }
}
