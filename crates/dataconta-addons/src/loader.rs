//! Resolving an entry point to a constructible addon type.
//!
//! Addons are compiled into the host and listed in an [`AddonCatalog`],
//! keyed by source-unit (module) name. Each catalog entry is a module
//! initializer: running it yields an [`AddonModule`] that exports one or
//! more addon types by name. The bundle on disk selects which module and
//! type to use through its `entry_point`, and must ship the matching source
//! unit file.
//!
//! A module is initialized once per bundle and cached under a scoped key
//! `addon_<bundle dir>_<module>`. Two bundles that both ship a module
//! called `main` therefore never share module state.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, warn};

use crate::addon::{Addon, AddonInstance, guarded};
use crate::context::AddonContext;
use crate::error::{AddonError, AddonResult};
use crate::manifest::split_entry_point;

/// Version of the addon contract this host implements. Exports built
/// against a different version are rejected at load time.
pub const ADDON_CONTRACT_VERSION: u32 = 1;

/// Builds an addon from its context.
pub type AddonConstructor = fn(AddonContext) -> AddonResult<Box<dyn Addon>>;

/// Runs a module's initialization and returns its exports.
pub type ModuleInit = fn() -> AddonResult<AddonModule>;

#[derive(Clone, Copy)]
struct AddonExport {
    contract_version: u32,
    constructor: AddonConstructor,
}

/// The exports of an initialized addon module.
#[derive(Default)]
pub struct AddonModule {
    exports: HashMap<String, AddonExport>,
}

impl AddonModule {
    /// Create a module with no exports.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Export an addon type built against the current contract.
    #[must_use]
    pub fn export(self, type_name: &str, constructor: AddonConstructor) -> Self {
        self.export_versioned(type_name, ADDON_CONTRACT_VERSION, constructor)
    }

    /// Export an addon type built against a specific contract version.
    #[must_use]
    pub fn export_versioned(
        mut self,
        type_name: &str,
        contract_version: u32,
        constructor: AddonConstructor,
    ) -> Self {
        self.exports.insert(
            type_name.to_owned(),
            AddonExport {
                contract_version,
                constructor,
            },
        );
        self
    }

    /// Names of the exported types, sorted.
    #[must_use]
    pub fn exported_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for AddonModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonModule")
            .field("exports", &self.exported_types())
            .finish()
    }
}

/// Compiled-in addon modules, keyed by module name.
///
/// A key may also be qualified with the bundle directory
/// (`"<dir>/<module>"`), which takes precedence over the bare module name
/// for that bundle only.
#[derive(Default, Clone)]
pub struct AddonCatalog {
    modules: HashMap<String, ModuleInit>,
}

impl AddonCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module initializer under `key`, replacing any previous one.
    pub fn register(&mut self, key: &str, init: ModuleInit) -> &mut Self {
        self.modules.insert(key.to_owned(), init);
        self
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_module(mut self, key: &str, init: ModuleInit) -> Self {
        self.register(key, init);
        self
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn resolve(&self, bundle_dir: &str, module: &str) -> Option<ModuleInit> {
        self.modules
            .get(&format!("{bundle_dir}/{module}"))
            .or_else(|| self.modules.get(module))
            .copied()
    }
}

impl fmt::Debug for AddonCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.modules.keys().collect();
        keys.sort_unstable();
        f.debug_struct("AddonCatalog").field("modules", &keys).finish()
    }
}

/// A resolved addon type, ready to be instantiated.
#[derive(Clone)]
pub struct AddonClass {
    scoped_module: String,
    type_name: String,
    contract_version: u32,
    constructor: AddonConstructor,
}

impl AddonClass {
    /// Scoped module key (`addon_<bundle dir>_<module>`).
    #[must_use]
    pub fn scoped_module(&self) -> &str {
        &self.scoped_module
    }

    /// Exported type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Contract version the type was built against.
    #[must_use]
    pub fn contract_version(&self) -> u32 {
        self.contract_version
    }
}

impl fmt::Debug for AddonClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonClass")
            .field("scoped_module", &self.scoped_module)
            .field("type_name", &self.type_name)
            .field("contract_version", &self.contract_version)
            .finish_non_exhaustive()
    }
}

/// Bridge from a bundle on disk to a live addon.
pub trait AddonLoader: Send + Sync {
    /// Resolve `entry_point` inside the bundle at `location`.
    fn load_addon_class(&self, location: &Path, entry_point: &str) -> Option<AddonClass>;

    /// Whether `class` satisfies the addon contract this host implements.
    fn validate_addon_class(&self, class: &AddonClass) -> bool;

    /// Construct an addon. Construction errors and panics yield `None`.
    fn create_addon_instance(
        &self,
        class: &AddonClass,
        context: AddonContext,
    ) -> Option<AddonInstance>;
}

/// Loader backed by an [`AddonCatalog`].
pub struct CatalogLoader {
    catalog: AddonCatalog,
    module_extension: String,
    modules: RwLock<HashMap<String, Arc<AddonModule>>>,
}

impl CatalogLoader {
    /// Create a loader that expects source units named `<module>.<ext>`.
    #[must_use]
    pub fn new(catalog: AddonCatalog, module_extension: &str) -> Self {
        Self {
            catalog,
            module_extension: module_extension.to_owned(),
            modules: RwLock::new(HashMap::new()),
        }
    }

    /// Scoped keys of the modules initialized so far, sorted.
    #[must_use]
    pub fn loaded_modules(&self) -> Vec<String> {
        let modules = self.modules.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = modules.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop the cached module for a bundle so the next load re-initializes it.
    pub fn forget_module(&self, scoped_module: &str) -> bool {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(scoped_module)
            .is_some()
    }

    fn try_load_class(&self, location: &Path, entry_point: &str) -> AddonResult<AddonClass> {
        let (module, type_name) = split_entry_point(entry_point)
            .ok_or_else(|| AddonError::InvalidEntryPoint(entry_point.to_owned()))?;

        let source = location.join(format!("{module}.{}", self.module_extension));
        if !source.is_file() {
            return Err(AddonError::ModuleNotFound {
                module: module.to_owned(),
                location: location.to_path_buf(),
            });
        }

        let bundle_dir = location
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let scoped = format!("addon_{bundle_dir}_{module}");
        let exports = self.module_for(&scoped, bundle_dir, module, location)?;

        let export = exports
            .exports
            .get(type_name)
            .copied()
            .ok_or_else(|| AddonError::TypeNotFound {
                module: module.to_owned(),
                type_name: type_name.to_owned(),
            })?;

        let class = AddonClass {
            scoped_module: scoped,
            type_name: type_name.to_owned(),
            contract_version: export.contract_version,
            constructor: export.constructor,
        };
        if !self.validate_addon_class(&class) {
            return Err(AddonError::ContractViolation(format!(
                "{}.{type_name}",
                class.scoped_module
            )));
        }
        Ok(class)
    }

    fn module_for(
        &self,
        scoped: &str,
        bundle_dir: &str,
        module: &str,
        location: &Path,
    ) -> AddonResult<Arc<AddonModule>> {
        if let Some(cached) = self
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scoped)
        {
            return Ok(Arc::clone(cached));
        }

        let init = self
            .catalog
            .resolve(bundle_dir, module)
            .ok_or_else(|| AddonError::ModuleNotFound {
                module: module.to_owned(),
                location: location.to_path_buf(),
            })?;
        let initialized = Arc::new(guarded(scoped, "module init", init)?);
        debug!(module = %scoped, exports = ?initialized.exported_types(), "Initialized addon module");

        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scoped.to_owned(), Arc::clone(&initialized));
        Ok(initialized)
    }
}

impl AddonLoader for CatalogLoader {
    fn load_addon_class(&self, location: &Path, entry_point: &str) -> Option<AddonClass> {
        match self.try_load_class(location, entry_point) {
            Ok(class) => Some(class),
            Err(e) => {
                error!(
                    path = %location.display(),
                    entry_point,
                    error = %e,
                    "Failed to load addon class"
                );
                None
            },
        }
    }

    fn validate_addon_class(&self, class: &AddonClass) -> bool {
        if class.type_name.is_empty() {
            warn!(module = %class.scoped_module, "Addon class has no type name");
            return false;
        }
        if class.contract_version != ADDON_CONTRACT_VERSION {
            warn!(
                module = %class.scoped_module,
                type_name = %class.type_name,
                found = class.contract_version,
                expected = ADDON_CONTRACT_VERSION,
                "Addon class built against a different contract version"
            );
            return false;
        }
        true
    }

    fn create_addon_instance(
        &self,
        class: &AddonClass,
        context: AddonContext,
    ) -> Option<AddonInstance> {
        let expected = context.manifest().name.clone();
        let constructor = class.constructor;
        let built = guarded(&expected, "construct", || constructor(context))
            .and_then(AddonInstance::new);
        match built {
            Ok(instance) => {
                if instance.name() != expected {
                    warn!(
                        expected = %expected,
                        reported = %instance.name(),
                        "Addon reports a different name than its bundle manifest"
                    );
                }
                Some(instance)
            },
            Err(e) => {
                error!(
                    addon = %expected,
                    type_name = %class.type_name,
                    error = %e,
                    "Failed to create addon instance"
                );
                None
            },
        }
    }
}

impl fmt::Debug for CatalogLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogLoader")
            .field("catalog", &self.catalog)
            .field("module_extension", &self.module_extension)
            .field("loaded_modules", &self.loaded_modules())
            .finish()
    }
}
