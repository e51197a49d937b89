//! Addon registry.
//!
//! The authoritative table of loaded addon instances, keyed by addon name,
//! and the dispatch point for named actions. Reads return snapshots, so a
//! caller iterating the result never observes a concurrent registration.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::addon::{ActionParams, AddonInstance, SharedAddon, guarded, lock_addon};
use crate::manifest::AddonType;

/// Registry of loaded addons.
pub struct AddonRegistry {
    addons: RwLock<HashMap<String, SharedAddon>>,
}

impl AddonRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            addons: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SharedAddon>> {
        self.addons.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SharedAddon>> {
        self.addons.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `instance` under `name`, replacing any previous entry.
    pub fn register(&self, name: &str, instance: AddonInstance) -> bool {
        self.register_shared(name, instance.into_shared())
    }

    /// Register an already shared instance under `name`.
    pub fn register_shared(&self, name: &str, instance: SharedAddon) -> bool {
        if self.write().insert(name.to_owned(), instance).is_some() {
            warn!(addon = %name, "Replaced existing addon registration");
        } else {
            info!(addon = %name, "Registered addon");
        }
        true
    }

    /// Remove `name`. Removing an absent name succeeds.
    pub fn unregister(&self, name: &str) -> bool {
        if self.write().remove(name).is_some() {
            info!(addon = %name, "Unregistered addon");
        } else {
            debug!(addon = %name, "Unregister of unknown addon ignored");
        }
        true
    }

    /// Look up an addon by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SharedAddon> {
        self.read().get(name).cloned()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Snapshot of every registered addon.
    #[must_use]
    pub fn get_all(&self) -> HashMap<String, SharedAddon> {
        self.read().clone()
    }

    /// Snapshot of addons whose manifest declares `addon_type`.
    ///
    /// Addons that panic while reporting their manifest are skipped.
    #[must_use]
    pub fn get_by_type(&self, addon_type: AddonType) -> HashMap<String, SharedAddon> {
        self.get_all()
            .into_iter()
            .filter(|(name, addon)| match lock_addon(addon).current_manifest() {
                Ok(manifest) => manifest.addon_type == addon_type,
                Err(e) => {
                    warn!(addon = %name, error = %e, "Skipping addon with unreadable manifest");
                    false
                },
            })
            .collect()
    }

    /// Snapshot of active addons.
    #[must_use]
    pub fn get_active(&self) -> HashMap<String, SharedAddon> {
        self.get_all()
            .into_iter()
            .filter(|(_, addon)| lock_addon(addon).is_active())
            .collect()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered addons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Run `action` from the addon's own action table.
    ///
    /// Returns `None` (and logs a warning) if the addon is not registered,
    /// not active, has no such action, or the handler fails. The addon lock
    /// is released before the handler runs.
    pub fn execute_action(
        &self,
        name: &str,
        action: &str,
        params: &ActionParams,
    ) -> Option<serde_json::Value> {
        let Some(addon) = self.get(name) else {
            warn!(addon = %name, action, "Action refused: addon not registered");
            return None;
        };

        let handler = {
            let instance = lock_addon(&addon);
            if let Err(e) = instance.ensure_active() {
                warn!(addon = %name, action, error = %e, "Action refused");
                return None;
            }
            instance.actions().get(action).cloned()
        };
        let Some(handler) = handler else {
            warn!(addon = %name, action, "Unknown addon action");
            return None;
        };

        match guarded(name, action, || handler(params)) {
            Ok(value) => {
                debug!(addon = %name, action, "Addon action completed");
                Some(value)
            },
            Err(e) => {
                warn!(addon = %name, action, error = %e, "Addon action failed");
                None
            },
        }
    }
}

impl Default for AddonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AddonRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonRegistry")
            .field("addon_count", &self.len())
            .finish()
    }
}
