//! Addon menu integration.
//!
//! Projects the manifest menu contributions of active addons into the host
//! menu model. Every addon gets its own category `addon_<name>` and every
//! contributed action is namespaced as `addon_<name>_<action>`, so two
//! addons declaring the same action never collide. The host-authored
//! [`MenuConfig`] is only ever read.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::model::{MenuAction, MenuCategory, MenuConfig, MenuItem};
use crate::addon::{ActionParams, SharedAddon, guarded, lock_addon};
use crate::manager::AddonManager;
use crate::manifest::MenuContribution;

const ADDON_PREFIX: &str = "addon_";
const CATEGORY_ICON: &str = "📦";
const DEFAULT_ITEM_ICON: &str = "⚡";
const DEFAULT_ITEM_LABEL: &str = "Addon action";

/// Namespaced category id for an addon.
#[must_use]
pub fn addon_category_id(addon: &str) -> String {
    format!("{ADDON_PREFIX}{addon}")
}

/// Namespaced action id for an addon's declared action.
#[must_use]
pub fn addon_action_id(addon: &str, action: &str) -> String {
    format!("{ADDON_PREFIX}{addon}_{action}")
}

/// Reverse mapping from a namespaced action id to the addon that owns it.
#[derive(Clone)]
pub struct AddonMenuAction {
    /// Namespaced action id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Owning addon name. The live instance is looked up by this name when
    /// the action runs.
    pub addon_name: String,
    /// Action name as declared by the addon.
    pub addon_action: String,
    /// Whether the host should confirm before running it.
    pub requires_confirmation: bool,
}

impl fmt::Debug for AddonMenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonMenuAction")
            .field("id", &self.id)
            .field("addon_name", &self.addon_name)
            .field("addon_action", &self.addon_action)
            .field("requires_confirmation", &self.requires_confirmation)
            .finish_non_exhaustive()
    }
}

/// A merged action entry, host or addon.
#[derive(Debug, Clone)]
pub enum CombinedAction {
    /// Action from the host menu config.
    Host(MenuAction),
    /// Action contributed by an addon.
    Addon(AddonMenuAction),
}

/// Where [`AddonMenuIntegration::route_action`] sent an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRoute {
    /// Dispatched to an addon.
    Addon {
        /// Whether the addon ran it successfully.
        executed: bool,
    },
    /// A host action; the host runs it.
    Host(MenuAction),
    /// Nobody owns this id.
    Unknown,
}

/// Counts of addon-contributed menu structures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddonMenuStats {
    /// Number of addon categories.
    pub addon_categories: usize,
    /// Number of addon actions.
    pub addon_actions: usize,
    /// Addon category ids, in display order.
    pub categories: Vec<String>,
    /// Items across all addon categories.
    pub total_menu_items: usize,
}

/// Keeps addon menu contributions alongside the host menu.
pub struct AddonMenuIntegration {
    host_menu: Arc<MenuConfig>,
    manager: Arc<AddonManager>,
    categories: RwLock<IndexMap<String, MenuCategory>>,
    actions: RwLock<IndexMap<String, AddonMenuAction>>,
}

impl AddonMenuIntegration {
    /// Create an integration with no addon menus loaded yet.
    #[must_use]
    pub fn new(host_menu: Arc<MenuConfig>, manager: Arc<AddonManager>) -> Self {
        Self {
            host_menu,
            manager,
            categories: RwLock::new(IndexMap::new()),
            actions: RwLock::new(IndexMap::new()),
        }
    }

    /// The host-authored menu.
    #[must_use]
    pub fn host_menu(&self) -> &MenuConfig {
        &self.host_menu
    }

    /// Build menus for every active addon. A failure in one addon's
    /// contributions is logged and does not stop the others.
    pub fn load_addon_menus(&self) -> bool {
        let active = self.manager.get_active_addons();
        let mut names: Vec<&String> = active.keys().collect();
        names.sort();

        let mut loaded = 0usize;
        for name in names {
            let Some(addon) = active.get(name) else {
                continue;
            };
            let result = guarded(name, "load_menu", || {
                self.load_addon_menu(name, addon);
                Ok(())
            });
            match result {
                Ok(()) => loaded = loaded.saturating_add(1),
                Err(e) => warn!(addon = %name, error = %e, "Failed to load addon menu"),
            }
        }
        info!(loaded, active = active.len(), "Loaded addon menus");
        true
    }

    fn load_addon_menu(&self, name: &str, addon: &SharedAddon) {
        let contributions = lock_addon(addon).manifest().menu_items.clone();
        if contributions.is_empty() {
            return;
        }

        let category_id = addon_category_id(name);
        let mut category = MenuCategory::new(&category_id, name, CATEGORY_ICON);
        let mut new_actions = Vec::with_capacity(contributions.len());
        let mut actions = self.actions.write().unwrap_or_else(PoisonError::into_inner);

        for contribution in &contributions {
            if contribution.action.is_empty() {
                warn!(
                    addon = %name,
                    item_id = %contribution.id,
                    "Skipping menu item without action"
                );
                continue;
            }
            let action_id = addon_action_id(name, &contribution.action);
            if let Some(owner) = actions
                .get(&action_id)
                .map(|a| a.addon_name.as_str())
                .filter(|owner| *owner != name)
            {
                warn!(
                    addon = %name,
                    action_id = %action_id,
                    owner = %owner,
                    "Skipping menu item whose action id is taken by another addon"
                );
                continue;
            }
            category.submenu.push(Self::menu_item(name, &action_id, contribution));
            new_actions.push(AddonMenuAction {
                id: action_id,
                title: Self::label_of(contribution).to_owned(),
                description: contribution.description.clone().unwrap_or_default(),
                addon_name: name.to_owned(),
                addon_action: contribution.action.clone(),
                requires_confirmation: contribution.requires_confirmation,
            });
        }

        if category.submenu.is_empty() {
            return;
        }
        for action in new_actions {
            actions.insert(action.id.clone(), action);
        }
        drop(actions);
        debug!(addon = %name, items = category.submenu.len(), "Loaded addon menu");
        self.categories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(category_id, category);
    }

    fn label_of(contribution: &MenuContribution) -> &str {
        if contribution.label.is_empty() {
            DEFAULT_ITEM_LABEL
        } else {
            &contribution.label
        }
    }

    fn menu_item(addon: &str, action_id: &str, contribution: &MenuContribution) -> MenuItem {
        let label = Self::label_of(contribution);
        let confirmation = contribution.requires_confirmation.then(|| {
            contribution
                .confirmation
                .clone()
                .unwrap_or_else(|| format!("Run '{label}' from addon {addon}?"))
        });
        MenuItem {
            id: if contribution.id.is_empty() {
                action_id.to_owned()
            } else {
                contribution.id.clone()
            },
            label: label.to_owned(),
            icon: contribution
                .icon
                .clone()
                .filter(|icon| !icon.is_empty())
                .unwrap_or_else(|| DEFAULT_ITEM_ICON.to_owned()),
            action: action_id.to_owned(),
            enabled: true,
            confirmation,
        }
    }

    /// Run a namespaced addon action. Returns `false` if the id is unknown,
    /// the owning addon is no longer active, or the action fails.
    pub fn execute_addon_action(&self, action_id: &str, params: &ActionParams) -> bool {
        let action = self
            .actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(action_id)
            .cloned();
        let Some(action) = action else {
            warn!(action_id, "Addon menu action not found");
            return false;
        };

        let Some(addon) = self.manager.registry().get(&action.addon_name) else {
            warn!(
                addon = %action.addon_name,
                action_id,
                "Addon menu action refused: addon is not loaded"
            );
            return false;
        };
        let mut instance = lock_addon(&addon);
        if !instance.is_active() {
            warn!(
                addon = %action.addon_name,
                action_id,
                "Addon menu action refused: addon is not active"
            );
            return false;
        }

        info!(addon = %action.addon_name, action_id, "Running addon menu action");
        let executed = instance.execute_action(&action.addon_action, params);
        if !executed {
            warn!(addon = %action.addon_name, action_id, "Addon menu action failed");
        }
        executed
    }

    /// Drop all addon menus and rebuild them from the currently active
    /// addons.
    pub fn reload_addon_menus(&self) -> bool {
        self.categories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.load_addon_menus()
    }

    /// Remove one addon's category and actions. Everything else is left
    /// as is.
    pub fn unload_addon_menu(&self, name: &str) -> bool {
        let category_id = addon_category_id(name);
        self.categories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(&category_id);
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, action| action.addon_name != name);
        info!(addon = %name, "Unloaded addon menu");
        true
    }

    /// Addon categories only, in load order.
    #[must_use]
    pub fn addon_categories(&self) -> IndexMap<String, MenuCategory> {
        self.categories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Host categories followed by addon categories.
    #[must_use]
    pub fn get_combined_categories(&self) -> IndexMap<String, MenuCategory> {
        let mut combined = self.host_menu.horizontal_menu.clone();
        let categories = self.categories.read().unwrap_or_else(PoisonError::into_inner);
        for (id, category) in categories.iter() {
            combined.insert(id.clone(), category.clone());
        }
        combined
    }

    /// Host actions followed by addon actions.
    #[must_use]
    pub fn get_combined_actions(&self) -> IndexMap<String, CombinedAction> {
        let mut combined: IndexMap<String, CombinedAction> = self
            .host_menu
            .menu_actions
            .iter()
            .map(|(id, action)| (id.clone(), CombinedAction::Host(action.clone())))
            .collect();
        let actions = self.actions.read().unwrap_or_else(PoisonError::into_inner);
        for (id, action) in actions.iter() {
            combined.insert(id.clone(), CombinedAction::Addon(action.clone()));
        }
        combined
    }

    /// Whether `action_id` is currently contributed by an addon.
    #[must_use]
    pub fn is_addon_action(&self, action_id: &str) -> bool {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(action_id)
    }

    /// Counts for diagnostics.
    #[must_use]
    pub fn get_addon_menu_stats(&self) -> AddonMenuStats {
        let categories = self.categories.read().unwrap_or_else(PoisonError::into_inner);
        AddonMenuStats {
            addon_categories: categories.len(),
            addon_actions: self
                .actions
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            categories: categories.keys().cloned().collect(),
            total_menu_items: categories.values().map(|c| c.submenu.len()).sum(),
        }
    }

    /// Route a clicked action: addon actions are executed here, host
    /// actions are handed back for the host to run.
    pub fn route_action(&self, action_id: &str, params: &ActionParams) -> ActionRoute {
        if self.is_addon_action(action_id) {
            return ActionRoute::Addon {
                executed: self.execute_addon_action(action_id, params),
            };
        }
        match self.host_menu.menu_actions.get(action_id) {
            Some(action) => ActionRoute::Host(action.clone()),
            None => ActionRoute::Unknown,
        }
    }
}

impl fmt::Debug for AddonMenuIntegration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonMenuIntegration")
            .field("stats", &self.get_addon_menu_stats())
            .finish_non_exhaustive()
    }
}
