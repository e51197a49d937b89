//! The addon contract and the lifecycle wrapper shared by every addon.
//!
//! Addon authors implement [`Addon`]. The addon system never calls an
//! `Addon` directly. It goes through [`AddonInstance`], which owns the status
//! state machine and contains failures:
//!
//! ```text
//! Inactive --activate (initialize ok)--> Active --deactivate--> Inactive
//! Inactive | Active --initialize/shutdown fails--> Error
//! Error --activate (retry)--> Active | Error
//! ```
//!
//! Errors and panics from addon code are logged and reported as `false`.
//! They never reach the caller.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::context::ConfigMap;
use crate::error::{AddonError, AddonResult};
use crate::manifest::AddonManifest;

/// Parameters passed to an action.
pub type ActionParams = serde_json::Map<String, serde_json::Value>;

/// A callable registered in an addon's action table.
pub type ActionHandler =
    Arc<dyn Fn(&ActionParams) -> AddonResult<serde_json::Value> + Send + Sync>;

/// Action name to handler.
pub type ActionTable = HashMap<String, ActionHandler>;

/// A live addon shared between the registry and the menu layer.
pub type SharedAddon = Arc<Mutex<AddonInstance>>;

/// Wrap a closure as an [`ActionHandler`].
pub fn action_handler<F>(f: F) -> ActionHandler
where
    F: Fn(&ActionParams) -> AddonResult<serde_json::Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Lock a shared addon, recovering the guard if a previous holder panicked.
pub fn lock_addon(addon: &SharedAddon) -> MutexGuard<'_, AddonInstance> {
    addon.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lifecycle status of a loaded addon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonStatus {
    /// Loaded but not running.
    Inactive,
    /// Initialized and accepting actions.
    Active,
    /// The last `initialize` or `shutdown` failed.
    Error,
}

impl fmt::Display for AddonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "inactive"),
            Self::Active => write!(f, "active"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The capability set every addon implements.
///
/// Only [`manifest`](Addon::manifest), [`initialize`](Addon::initialize) and
/// [`shutdown`](Addon::shutdown) are required. The default
/// [`execute_action`](Addon::execute_action) dispatches through
/// [`actions`](Addon::actions).
pub trait Addon: Send + Sync {
    /// The addon's manifest. Must work before `initialize`.
    fn manifest(&self) -> &AddonManifest;

    /// Acquire resources. Called once per activation cycle.
    ///
    /// # Errors
    ///
    /// Any error moves the addon to [`AddonStatus::Error`].
    fn initialize(&mut self) -> AddonResult<()>;

    /// Release what `initialize` acquired.
    ///
    /// # Errors
    ///
    /// Any error moves the addon to [`AddonStatus::Error`].
    fn shutdown(&mut self) -> AddonResult<()>;

    /// The addon's own action table.
    fn actions(&self) -> ActionTable {
        ActionTable::new()
    }

    /// Run a named action.
    ///
    /// # Errors
    ///
    /// Returns [`AddonError::UnknownAction`] if the action is not in the
    /// table, or whatever the handler returns.
    fn execute_action(&mut self, action: &str, params: &ActionParams) -> AddonResult<()> {
        let table = self.actions();
        let handler = table.get(action).ok_or_else(|| AddonError::UnknownAction {
            addon: self.manifest().name.clone(),
            action: action.to_owned(),
        })?;
        handler(params).map(|_| ())
    }

    /// JSON schema describing the addon's configuration, if any.
    fn config_schema(&self) -> Option<serde_json::Value> {
        None
    }

    /// React to a configuration change saved by the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the new configuration is rejected.
    fn handle_config_change(&mut self, _config: &ConfigMap) -> AddonResult<()> {
        Ok(())
    }

    /// Named UI components the addon provides.
    fn ui_components(&self) -> Vec<String> {
        self.manifest().ui_components.clone()
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Run addon code, turning a panic into [`AddonError::Panicked`].
pub(crate) fn guarded<T>(
    name: &str,
    operation: &str,
    f: impl FnOnce() -> AddonResult<T>,
) -> AddonResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            warn!(
                addon = %name,
                operation,
                error = %panic_message(payload.as_ref()),
                "Addon panicked"
            );
            Err(AddonError::Panicked {
                name: name.to_owned(),
                operation: operation.to_owned(),
            })
        },
    }
}

/// A live addon with lifecycle bookkeeping.
pub struct AddonInstance {
    addon: Box<dyn Addon>,
    manifest: AddonManifest,
    status: AddonStatus,
    initialized: bool,
    last_error: Option<String>,
}

impl AddonInstance {
    /// Wrap a constructed addon. The manifest is captured here and stays
    /// fixed for the life of the instance.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the manifest panics.
    pub fn new(addon: Box<dyn Addon>) -> AddonResult<Self> {
        let manifest = guarded("<unknown>", "manifest", || Ok(addon.manifest().clone()))?;
        Ok(Self {
            addon,
            manifest,
            status: AddonStatus::Inactive,
            initialized: false,
            last_error: None,
        })
    }

    /// Wrap in the shared handle used by the registry.
    #[must_use]
    pub fn into_shared(self) -> SharedAddon {
        Arc::new(Mutex::new(self))
    }

    /// The manifest captured at construction.
    #[must_use]
    pub fn manifest(&self) -> &AddonManifest {
        &self.manifest
    }

    /// Ask the addon for its manifest again.
    ///
    /// # Errors
    ///
    /// Returns an error if the addon panics.
    pub fn current_manifest(&self) -> AddonResult<AddonManifest> {
        guarded(&self.manifest.name, "manifest", || {
            Ok(self.addon.manifest().clone())
        })
    }

    /// Addon name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Addon version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> AddonStatus {
        self.status
    }

    /// Whether the addon is [`AddonStatus::Active`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AddonStatus::Active
    }

    /// Whether `initialize` has succeeded since the last deactivation.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Message of the most recent lifecycle or action failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Initialize if needed and mark active.
    ///
    /// Returns `false` and moves to [`AddonStatus::Error`] if `initialize`
    /// fails. Calling again later retries initialization.
    pub fn activate(&mut self) -> bool {
        if !self.initialized {
            let name = self.manifest.name.clone();
            let addon = &mut self.addon;
            if let Err(e) = guarded(&name, "initialize", || addon.initialize()) {
                self.fail("initialize", &e);
                return false;
            }
            self.initialized = true;
        }
        self.status = AddonStatus::Active;
        self.last_error = None;
        info!(addon = %self.manifest.name, "Addon activated");
        true
    }

    /// Shut down and mark inactive.
    ///
    /// An addon that was never initialized only changes status. After a
    /// failed `shutdown` the addon is in [`AddonStatus::Error`] and the next
    /// `activate` re-initializes it.
    pub fn deactivate(&mut self) -> bool {
        if !self.initialized {
            self.status = AddonStatus::Inactive;
            return true;
        }
        let name = self.manifest.name.clone();
        let addon = &mut self.addon;
        let result = guarded(&name, "shutdown", || addon.shutdown());
        self.initialized = false;
        match result {
            Ok(()) => {
                self.status = AddonStatus::Inactive;
                info!(addon = %self.manifest.name, "Addon deactivated");
                true
            },
            Err(e) => {
                self.fail("shutdown", &e);
                false
            },
        }
    }

    /// Error unless the addon is active.
    ///
    /// # Errors
    ///
    /// Returns [`AddonError::Inactive`] when the status is anything other
    /// than [`AddonStatus::Active`].
    pub fn ensure_active(&self) -> AddonResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(AddonError::Inactive(self.manifest.name.clone()))
        }
    }

    /// The addon's action table. Empty if the addon panics producing it.
    #[must_use]
    pub fn actions(&self) -> ActionTable {
        guarded(&self.manifest.name, "actions", || Ok(self.addon.actions())).unwrap_or_default()
    }

    /// Run `action` through the addon's own dispatcher.
    ///
    /// Refuses when the addon is not active. Unknown actions, handler errors
    /// and panics are logged and reported as `false`.
    pub fn execute_action(&mut self, action: &str, params: &ActionParams) -> bool {
        if let Err(e) = self.ensure_active() {
            warn!(addon = %self.manifest.name, action, error = %e, "Action refused");
            return false;
        }
        let name = self.manifest.name.clone();
        let addon = &mut self.addon;
        match guarded(&name, action, || addon.execute_action(action, params)) {
            Ok(()) => {
                debug!(addon = %name, action, "Action executed");
                true
            },
            Err(e) => {
                warn!(addon = %name, action, error = %e, "Action failed");
                self.last_error = Some(e.to_string());
                false
            },
        }
    }

    /// The addon's configuration schema, if it declares one.
    #[must_use]
    pub fn config_schema(&self) -> Option<serde_json::Value> {
        guarded(&self.manifest.name, "config_schema", || {
            Ok(self.addon.config_schema())
        })
        .ok()
        .flatten()
    }

    /// UI components the addon provides.
    #[must_use]
    pub fn ui_components(&self) -> Vec<String> {
        guarded(&self.manifest.name, "ui_components", || {
            Ok(self.addon.ui_components())
        })
        .unwrap_or_default()
    }

    /// Forward a configuration change to the addon.
    pub fn handle_config_change(&mut self, config: &ConfigMap) -> bool {
        let name = self.manifest.name.clone();
        let addon = &mut self.addon;
        match guarded(&name, "handle_config_change", || {
            addon.handle_config_change(config)
        }) {
            Ok(()) => true,
            Err(e) => {
                warn!(addon = %name, error = %e, "Addon rejected configuration change");
                false
            },
        }
    }

    fn fail(&mut self, operation: &'static str, cause: &AddonError) {
        let err = AddonError::Lifecycle {
            name: self.manifest.name.clone(),
            operation,
            message: cause.to_string(),
        };
        error!(addon = %self.manifest.name, operation, error = %err, "Addon lifecycle failure");
        self.status = AddonStatus::Error;
        self.last_error = Some(err.to_string());
    }
}

impl fmt::Debug for AddonInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonInstance")
            .field("name", &self.manifest.name)
            .field("version", &self.manifest.version)
            .field("status", &self.status)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}
