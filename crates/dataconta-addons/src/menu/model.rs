//! Host menu data model.
//!
//! The host's horizontal menu is a set of categories, each holding a list of
//! items. Items name an action id; actions live in a separate table so
//! several items can share one. On disk the category and action ids are the
//! map keys.

use std::io::Write as _;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AddonError, AddonResult};

/// What kind of handler an action needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuActionKind {
    /// Shows a dialog with the action's content.
    #[default]
    Dialog,
    /// Handled by the host itself (exit, settings).
    System,
    /// Dispatched to an addon.
    Addon,
    /// Any kind this host does not know about.
    #[serde(other)]
    Other,
}

/// A single menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuItem {
    /// Item id.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Icon glyph.
    pub icon: String,
    /// Action id triggered by the item.
    pub action: String,
    /// Whether the item can be clicked.
    pub enabled: bool,
    /// Confirmation prompt shown before the action runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
}

impl Default for MenuItem {
    fn default() -> Self {
        Self {
            id: String::new(),
            label: String::new(),
            icon: String::new(),
            action: String::new(),
            enabled: true,
            confirmation: None,
        }
    }
}

/// A top-level menu category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuCategory {
    /// Category id (the map key on disk).
    #[serde(skip)]
    pub id: String,
    /// Display label.
    pub label: String,
    /// Icon glyph.
    pub icon: String,
    /// Whether the category is shown.
    pub enabled: bool,
    /// Items in display order.
    pub submenu: Vec<MenuItem>,
}

impl Default for MenuCategory {
    fn default() -> Self {
        Self {
            id: String::new(),
            label: String::new(),
            icon: String::new(),
            enabled: true,
            submenu: Vec::new(),
        }
    }
}

impl MenuCategory {
    /// Create an empty, enabled category.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            icon: icon.into(),
            ..Self::default()
        }
    }

    /// Append an item.
    #[must_use]
    pub fn with_item(mut self, item: MenuItem) -> Self {
        self.submenu.push(item);
        self
    }
}

/// A named action in the host action table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuAction {
    /// Action id (the map key on disk).
    #[serde(skip)]
    pub id: String,
    /// Handler kind.
    #[serde(rename = "type")]
    pub kind: MenuActionKind,
    /// Dialog title.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Dialog body.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Short description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// The host-authored menu.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Categories in display order.
    pub horizontal_menu: IndexMap<String, MenuCategory>,
    /// Action table.
    pub menu_actions: IndexMap<String, MenuAction>,
}

impl MenuConfig {
    /// The menu a fresh install starts with: a home category with an exit
    /// item.
    #[must_use]
    pub fn default_host_menu() -> Self {
        let exit = MenuItem {
            id: "salir".to_owned(),
            label: "Salir".to_owned(),
            icon: "🚪".to_owned(),
            action: "exit_application".to_owned(),
            enabled: true,
            confirmation: Some("¿Está seguro que desea salir?".to_owned()),
        };
        let mut config = Self::default();
        config.add_category(MenuCategory::new("inicio", "Inicio", "🏠").with_item(exit));
        config.add_action(MenuAction {
            id: "exit_application".to_owned(),
            kind: MenuActionKind::System,
            description: "Cerrar aplicación".to_owned(),
            ..MenuAction::default()
        });
        config
    }

    /// Parse a menu file body.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the text is not a valid menu document.
    pub fn from_json_str(text: &str) -> AddonResult<Self> {
        let mut config: Self = serde_json::from_str(text)?;
        config.assign_ids();
        Ok(config)
    }

    fn assign_ids(&mut self) {
        for (id, category) in &mut self.horizontal_menu {
            category.id.clone_from(id);
        }
        for (id, action) in &mut self.menu_actions {
            action.id.clone_from(id);
        }
    }

    /// Read the menu at `path`, writing `default` there first if the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or created.
    pub fn load_or_init(path: &Path, default: &Self) -> AddonResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::from_json_str(&text)?;
                debug!(
                    path = %path.display(),
                    categories = config.horizontal_menu.len(),
                    "Loaded menu config"
                );
                Ok(config)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                default.save(path)?;
                info!(path = %path.display(), "Created default menu config");
                Ok(default.clone())
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Write the menu to `path` atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> AddonResult<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let body = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| AddonError::Io(e.error))?;
        Ok(())
    }

    /// Insert or replace a category. Returns `true` if it was new.
    pub fn add_category(&mut self, category: MenuCategory) -> bool {
        self.horizontal_menu
            .insert(category.id.clone(), category)
            .is_none()
    }

    /// Remove a category, keeping the order of the rest.
    pub fn remove_category(&mut self, id: &str) -> Option<MenuCategory> {
        self.horizontal_menu.shift_remove(id)
    }

    /// Insert or replace an action. Returns `true` if it was new.
    pub fn add_action(&mut self, action: MenuAction) -> bool {
        self.menu_actions.insert(action.id.clone(), action).is_none()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_default_host_menu() {
        let menu = MenuConfig::default_host_menu();
        let inicio = &menu.horizontal_menu["inicio"];
        assert_eq!(inicio.label, "Inicio");
        assert_eq!(inicio.submenu[0].action, "exit_application");
        assert!(inicio.submenu[0].confirmation.is_some());
        assert_eq!(
            menu.menu_actions["exit_application"].kind,
            MenuActionKind::System
        );
    }

    #[test]
    fn test_load_or_init_writes_default_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("menu_config.json");
        let default = MenuConfig::default_host_menu();

        let first = MenuConfig::load_or_init(&path, &default).unwrap();
        assert!(path.is_file());
        assert_eq!(first, default);

        let mut edited = first.clone();
        edited.add_category(MenuCategory::new("reportes", "Reportes", "📊"));
        edited.save(&path).unwrap();

        let second = MenuConfig::load_or_init(&path, &default).unwrap();
        assert_eq!(second.horizontal_menu.len(), 2);
        assert_eq!(second.horizontal_menu["reportes"].id, "reportes");
    }

    #[test]
    fn test_parses_keyed_layout_with_unknown_kind() {
        let text = r#"{
            "horizontal_menu": {
                "facturas": {
                    "label": "Facturas",
                    "icon": "📄",
                    "submenu": [{"id": "consultar", "label": "Consultar", "action": "show_invoices"}]
                }
            },
            "menu_actions": {
                "show_invoices": {"type": "invoice", "title": "Facturas"}
            }
        }"#;
        let menu = MenuConfig::from_json_str(text).unwrap();
        let category = &menu.horizontal_menu["facturas"];
        assert!(category.enabled);
        assert!(category.submenu[0].enabled);
        assert_eq!(menu.menu_actions["show_invoices"].kind, MenuActionKind::Other);
        assert_eq!(menu.menu_actions["show_invoices"].id, "show_invoices");
    }

    #[test]
    fn test_remove_category_keeps_order() {
        let mut menu = MenuConfig::default();
        menu.add_category(MenuCategory::new("a", "A", ""));
        menu.add_category(MenuCategory::new("b", "B", ""));
        menu.add_category(MenuCategory::new("c", "C", ""));
        assert!(menu.remove_category("b").is_some());
        let ids: Vec<&String> = menu.horizontal_menu.keys().collect();
        assert_eq!(ids, ["a", "c"]);
        assert!(menu.remove_category("b").is_none());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("menu_config.json");
        std::fs::write(&path, "[").unwrap();
        assert!(MenuConfig::load_or_init(&path, &MenuConfig::default()).is_err());
    }
}
