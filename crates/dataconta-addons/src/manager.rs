//! Addon manager.
//!
//! The single entry point the host talks to. It drives the repository, the
//! loader and the registry through scan, load, enable, disable and unload.
//!
//! Every public operation is total: failures (including panics in addon
//! code or in a custom repository/loader) are logged with the addon name
//! and operation, then reported as `false` or `None`. Callers that want the
//! cause use [`AddonManager::try_load`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::addon::{ActionParams, AddonStatus, SharedAddon, guarded, lock_addon};
use crate::config::AddonSystemConfig;
use crate::context::{AddonContext, ConfigMap, HostServices};
use crate::error::{AddonError, AddonResult};
use crate::loader::AddonLoader;
use crate::manifest::{AddonManifest, AddonType};
use crate::registry::AddonRegistry;
use crate::repository::AddonRepository;
use crate::validate::validate_manifest;
use crate::version::check_compatibility;

/// Display status reported by [`AddonManager::get_addon_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoStatus {
    /// Discovered but not loaded.
    NotLoaded,
    /// Loaded, not running.
    Inactive,
    /// Loaded and running.
    Active,
    /// Loaded, last lifecycle call failed.
    Error,
}

impl From<AddonStatus> for InfoStatus {
    fn from(status: AddonStatus) -> Self {
        match status {
            AddonStatus::Inactive => Self::Inactive,
            AddonStatus::Active => Self::Active,
            AddonStatus::Error => Self::Error,
        }
    }
}

impl fmt::Display for InfoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoaded => write!(f, "not_loaded"),
            Self::Inactive => write!(f, "inactive"),
            Self::Active => write!(f, "active"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Display descriptor for one addon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonInfo {
    /// Addon name.
    pub name: String,
    /// Addon version.
    pub version: String,
    /// Description.
    pub description: String,
    /// Author.
    pub author: String,
    /// Addon category.
    #[serde(rename = "type")]
    pub addon_type: AddonType,
    /// Live status, or `not_loaded`.
    pub status: InfoStatus,
    /// Whether the addon is in the registry.
    pub loaded: bool,
    /// Whether the addon is active.
    pub active: bool,
    /// Last lifecycle or action error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Snapshot of the whole addon system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    /// Running host version.
    pub host_version: String,
    /// Addons root directory.
    pub addons_path: PathBuf,
    /// Number of discovered addons.
    pub discovered: usize,
    /// Number of loaded addons.
    pub loaded: usize,
    /// Number of active addons.
    pub active: usize,
}

/// Orchestrates discovery, loading and lifecycle of addons.
pub struct AddonManager {
    config: AddonSystemConfig,
    repository: Box<dyn AddonRepository>,
    loader: Box<dyn AddonLoader>,
    registry: Arc<AddonRegistry>,
    host: RwLock<Arc<HostServices>>,
    manifests: RwLock<HashMap<String, AddonManifest>>,
}

impl AddonManager {
    /// Create a manager with an empty registry and default host services.
    #[must_use]
    pub fn new(
        config: AddonSystemConfig,
        repository: Box<dyn AddonRepository>,
        loader: Box<dyn AddonLoader>,
    ) -> Self {
        Self {
            config,
            repository,
            loader,
            registry: Arc::new(AddonRegistry::new()),
            host: RwLock::new(Arc::new(HostServices::new())),
            manifests: RwLock::new(HashMap::new()),
        }
    }

    /// Use the given host services for addon contexts.
    #[must_use]
    pub fn with_host(self, host: HostServices) -> Self {
        *self.host.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(host);
        self
    }

    /// Share an existing registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<AddonRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// The registry holding loaded addons.
    #[must_use]
    pub fn registry(&self) -> &Arc<AddonRegistry> {
        &self.registry
    }

    /// Addon system settings.
    #[must_use]
    pub fn config(&self) -> &AddonSystemConfig {
        &self.config
    }

    /// Running host version.
    #[must_use]
    pub fn host_version(&self) -> &str {
        &self.config.host_version
    }

    /// Replace the host services. Addons loaded afterwards get a context
    /// built on the new services; already loaded addons keep the old one
    /// until they are reloaded.
    pub fn update_host(&self, host: HostServices) {
        *self.host.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(host);
        info!("Rebuilt addon host context");
    }

    // -----------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------

    /// Rediscover bundles and refresh the manifest cache.
    ///
    /// Returns the number of valid addons. Invalid bundles are skipped; when
    /// two bundles declare the same name the first (by path) wins.
    pub fn scan(&self) -> usize {
        match guarded("<scan>", "scan", || Ok(self.scan_inner())) {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Addon scan failed");
                0
            },
        }
    }

    fn scan_inner(&self) -> usize {
        let candidates = self.repository.find_all_addons();
        let mut found = HashMap::new();

        for location in &candidates {
            let Some(manifest) = self.accept(location) else {
                continue;
            };
            if found.contains_key(&manifest.name) {
                warn!(
                    addon = %manifest.name,
                    path = %location.display(),
                    "Duplicate addon name, keeping the first bundle"
                );
                continue;
            }
            found.insert(manifest.name.clone(), manifest);
        }

        let count = found.len();
        *self.manifests.write().unwrap_or_else(PoisonError::into_inner) = found;
        info!(
            found = candidates.len(),
            valid = count,
            "Scanned addons directory"
        );
        count
    }

    /// The manifest of a bundle `scan` would accept, or `None`.
    fn accept(&self, location: &Path) -> Option<AddonManifest> {
        if !self.repository.validate_addon(location) {
            debug!(path = %location.display(), "Excluding invalid addon bundle");
            return None;
        }
        let manifest = self.repository.load_addon_manifest(location)?;
        if self.config.strict_validation {
            let report = validate_manifest(&manifest);
            if !report.is_valid() {
                warn!(
                    path = %location.display(),
                    errors = ?report.errors,
                    "Excluding addon that fails manifest validation"
                );
                return None;
            }
        }
        Some(manifest)
    }

    /// Manifests from the last scan, sorted by name.
    #[must_use]
    pub fn discovered_addons(&self) -> Vec<AddonManifest> {
        let mut manifests: Vec<AddonManifest> = self
            .manifests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        manifests.sort_by(|a, b| a.name.cmp(&b.name));
        manifests
    }

    fn cached_manifest(&self, name: &str) -> Option<AddonManifest> {
        self.manifests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Whether `manifest` accepts the running host version.
    #[must_use]
    pub fn is_compatible(&self, manifest: &AddonManifest) -> bool {
        match check_compatibility(manifest, &self.config.host_version) {
            Ok(()) => true,
            Err(e) => {
                warn!(addon = %manifest.name, error = %e, "Addon is not compatible");
                false
            },
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Load `name` into the registry. Loading an already loaded addon
    /// succeeds without side effects.
    pub fn load(&self, name: &str) -> bool {
        match guarded(name, "load", || self.try_load(name)) {
            Ok(()) => true,
            Err(e) => {
                error!(addon = %name, operation = "load", error = %e, "Failed to load addon");
                false
            },
        }
    }

    /// Load `name`, reporting why it failed.
    ///
    /// # Errors
    ///
    /// - [`AddonError::NotFound`] if no bundle declares `name`, even after a
    ///   rescan.
    /// - [`AddonError::Incompatible`] if the host version is out of bounds.
    /// - [`AddonError::LoadFailed`] if the entry point cannot be resolved or
    ///   the addon cannot be constructed.
    pub fn try_load(&self, name: &str) -> AddonResult<()> {
        if self.registry.contains(name) {
            debug!(addon = %name, "Addon already loaded");
            return Ok(());
        }

        let manifest = match self.cached_manifest(name) {
            Some(m) => m,
            None => {
                self.scan();
                self.cached_manifest(name)
                    .ok_or_else(|| AddonError::NotFound(name.to_owned()))?
            },
        };

        check_compatibility(&manifest, &self.config.host_version)?;

        let location = self.locate(name).ok_or_else(|| AddonError::LoadFailed {
            name: name.to_owned(),
            message: "bundle directory no longer present".to_owned(),
        })?;

        let class = self
            .loader
            .load_addon_class(&location, &manifest.entry_point)
            .ok_or_else(|| AddonError::LoadFailed {
                name: name.to_owned(),
                message: format!("cannot resolve entry point '{}'", manifest.entry_point),
            })?;

        let context = self.context_for(manifest, location);
        let instance = self
            .loader
            .create_addon_instance(&class, context)
            .ok_or_else(|| AddonError::LoadFailed {
                name: name.to_owned(),
                message: format!("cannot construct '{}'", class.type_name()),
            })?;

        self.registry.register(name, instance);
        info!(addon = %name, "Addon loaded");
        Ok(())
    }

    /// Re-derive the bundle location by matching manifest names. Uses the
    /// same acceptance rules and order as `scan`, so the bundle found here is
    /// the one whose manifest was cached.
    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.repository
            .find_all_addons()
            .into_iter()
            .find(|path| self.accept(path).is_some_and(|m| m.name == name))
    }

    fn context_for(&self, manifest: AddonManifest, location: PathBuf) -> AddonContext {
        let host = Arc::clone(&self.host.read().unwrap_or_else(PoisonError::into_inner));
        let addon_config = self.repository.get_addon_config(&manifest.name);
        AddonContext::new(host, manifest, location).with_addon_config(addon_config)
    }

    /// Deactivate (if active) and remove `name`. Unloading an addon that is
    /// not loaded succeeds.
    pub fn unload(&self, name: &str) -> bool {
        self.boundary(name, "unload", || {
            let Some(addon) = self.registry.get(name) else {
                return Ok(true);
            };
            {
                let mut instance = lock_addon(&addon);
                if instance.is_active() && !instance.deactivate() {
                    warn!(addon = %name, "Addon shutdown failed during unload");
                }
            }
            self.registry.unregister(name);
            info!(addon = %name, "Addon unloaded");
            Ok(true)
        })
    }

    /// Load `name` if needed, then activate it.
    pub fn enable(&self, name: &str) -> bool {
        self.boundary(name, "enable", || {
            self.try_load(name)?;
            let addon = self
                .registry
                .get(name)
                .ok_or_else(|| AddonError::NotFound(name.to_owned()))?;
            let activated = lock_addon(&addon).activate();
            if activated {
                info!(addon = %name, "Addon enabled");
            }
            Ok(activated)
        })
    }

    /// Deactivate `name` if it is loaded. Disabling an addon that is not
    /// loaded succeeds.
    pub fn disable(&self, name: &str) -> bool {
        self.boundary(name, "disable", || {
            let Some(addon) = self.registry.get(name) else {
                return Ok(true);
            };
            let deactivated = lock_addon(&addon).deactivate();
            if deactivated {
                info!(addon = %name, "Addon disabled");
            }
            Ok(deactivated)
        })
    }

    /// Full unload followed by load and enable.
    pub fn reload(&self, name: &str) -> bool {
        self.unload(name) && self.enable(name)
    }

    /// Unload every loaded addon. Returns how many were unloaded.
    pub fn unload_all(&self) -> usize {
        self.registry
            .names()
            .iter()
            .filter(|name| self.unload(name))
            .count()
    }

    fn boundary(
        &self,
        name: &str,
        operation: &'static str,
        f: impl FnOnce() -> AddonResult<bool>,
    ) -> bool {
        match guarded(name, operation, f) {
            Ok(result) => result,
            Err(e) => {
                error!(addon = %name, operation, error = %e, "Addon operation failed");
                false
            },
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Display descriptor for `name`, or `None` if it is neither loaded nor
    /// discovered.
    #[must_use]
    pub fn get_addon_info(&self, name: &str) -> Option<AddonInfo> {
        if let Some(addon) = self.registry.get(name) {
            let instance = lock_addon(&addon);
            let m = instance.manifest();
            return Some(AddonInfo {
                name: m.name.clone(),
                version: m.version.clone(),
                description: m.description.clone(),
                author: m.author.clone(),
                addon_type: m.addon_type,
                status: instance.status().into(),
                loaded: true,
                active: instance.is_active(),
                last_error: instance.last_error().map(str::to_owned),
            });
        }
        self.cached_manifest(name).map(|m| AddonInfo {
            name: m.name,
            version: m.version,
            description: m.description,
            author: m.author,
            addon_type: m.addon_type,
            status: InfoStatus::NotLoaded,
            loaded: false,
            active: false,
            last_error: None,
        })
    }

    /// Names of loaded addons, sorted.
    #[must_use]
    pub fn get_loaded_addons(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Snapshot of active addons.
    #[must_use]
    pub fn get_active_addons(&self) -> HashMap<String, SharedAddon> {
        self.registry.get_active()
    }

    /// Whether `name` is loaded and active.
    #[must_use]
    pub fn is_addon_active(&self, name: &str) -> bool {
        self.registry
            .get(name)
            .is_some_and(|addon| lock_addon(&addon).is_active())
    }

    /// Run an action from the addon's action table.
    pub fn execute_action(
        &self,
        name: &str,
        action: &str,
        params: &ActionParams,
    ) -> Option<serde_json::Value> {
        self.registry.execute_action(name, action, params)
    }

    /// Persist configuration for `name` and notify the addon if loaded.
    pub fn configure(&self, name: &str, config: &ConfigMap) -> bool {
        self.boundary(name, "configure", || {
            if !self.repository.save_addon_config(name, config) {
                return Ok(false);
            }
            Ok(self
                .registry
                .get(name)
                .is_none_or(|addon| lock_addon(&addon).handle_config_change(config)))
        })
    }

    /// Persisted configuration for `name`.
    #[must_use]
    pub fn addon_config(&self, name: &str) -> ConfigMap {
        self.repository.get_addon_config(name)
    }

    /// Counts and settings for diagnostics.
    #[must_use]
    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            host_version: self.config.host_version.clone(),
            addons_path: self.config.addons_path.clone(),
            discovered: self
                .manifests
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            loaded: self.registry.len(),
            active: self.registry.get_active().len(),
        }
    }

    /// Addons root directory.
    #[must_use]
    pub fn addons_path(&self) -> &Path {
        &self.config.addons_path
    }
}

impl fmt::Debug for AddonManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonManager")
            .field("host_version", &self.config.host_version)
            .field("addons_path", &self.config.addons_path)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
