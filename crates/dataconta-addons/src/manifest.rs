//! Addon manifest types.
//!
//! A manifest (`manifest.json`) describes an addon's identity, entry point,
//! host compatibility bounds, menu contributions and advisory permissions.
//! Manifests are pure data: parsing has no side effects and every optional
//! collection defaults to empty.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{AddonError, AddonResult};

/// Name of the declaration file inside every addon bundle.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Minimum host version assumed when a manifest does not declare one.
pub const DEFAULT_MIN_HOST_VERSION: &str = "3.0.0";

/// The closed set of addon categories.
///
/// Unrecognized strings parse as [`AddonType::Utility`] so that a newer
/// manifest never becomes unreadable on an older host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddonType {
    /// Adds widgets or panels to the host UI.
    UiExtension,
    /// Transforms or enriches business data.
    DataProcessor,
    /// Writes data out in some format.
    Exporter,
    /// Bridges to an external system.
    Integration,
    /// Computes reports and indicators.
    Analytics,
    /// Sends notifications (email, chat).
    Notification,
    /// Security-related tooling.
    Security,
    /// Anything else.
    #[default]
    Utility,
}

impl AddonType {
    /// All variants, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::UiExtension,
        Self::DataProcessor,
        Self::Exporter,
        Self::Integration,
        Self::Analytics,
        Self::Notification,
        Self::Security,
        Self::Utility,
    ];

    /// The on-disk spelling of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UiExtension => "ui_extension",
            Self::DataProcessor => "data_processor",
            Self::Exporter => "exporter",
            Self::Integration => "integration",
            Self::Analytics => "analytics",
            Self::Notification => "notification",
            Self::Security => "security",
            Self::Utility => "utility",
        }
    }

    /// Parse a type string, returning `None` for unknown values.
    #[must_use]
    pub fn parse_known(s: &str) -> Option<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == lowered)
    }
}

impl FromStr for AddonType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_known(s).unwrap_or_default())
    }
}

impl fmt::Display for AddonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AddonType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AddonType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw.as_str().and_then(Self::parse_known).unwrap_or_default())
    }
}

/// A menu entry declared by an addon.
///
/// The menu layer namespaces `action` before exposing it to the host, so the
/// value here is the addon-local action name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuContribution {
    /// Item id, unique within the addon.
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    /// Display label.
    #[serde(deserialize_with = "lenient_string")]
    pub label: String,
    /// Optional icon (usually an emoji).
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub icon: Option<String>,
    /// Addon-local action name dispatched when the item is chosen.
    #[serde(deserialize_with = "lenient_string")]
    pub action: String,
    /// Ask the user before running the action.
    #[serde(deserialize_with = "lenient_bool")]
    pub requires_confirmation: bool,
    /// Custom confirmation prompt. A generic one is built when absent.
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub confirmation: Option<String>,
    /// Optional longer description.
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
}

/// A parsed addon manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonManifest {
    /// Addon identity. Unique within one host process.
    pub name: String,
    /// Semantic version string.
    #[serde(default = "default_version", deserialize_with = "version_or_default")]
    pub version: String,
    /// Free-form description.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Author or vendor.
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: String,
    /// Addon category.
    #[serde(default)]
    pub addon_type: AddonType,
    /// `module.TypeName` reference resolved relative to the bundle.
    pub entry_point: String,
    /// Oldest host version the addon supports.
    #[serde(
        rename = "min_dataconta_version",
        alias = "min_host_version",
        default = "default_min_host_version",
        deserialize_with = "min_host_version_or_default"
    )]
    pub min_host_version: String,
    /// Newest host version the addon supports, if bounded.
    #[serde(
        rename = "max_dataconta_version",
        alias = "max_host_version",
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_host_version: Option<String>,
    /// External libraries the addon expects. Advisory only.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub dependencies: Vec<String>,
    /// License tier the host should require (`FREE`, `PROFESSIONAL`, ...).
    #[serde(
        rename = "requires_license",
        alias = "required_license_tier",
        default = "default_license_tier",
        deserialize_with = "license_tier_or_default"
    )]
    pub required_license_tier: String,
    /// Capability strings the addon asks for. Advisory only.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub permissions: BTreeSet<String>,
    /// Declared menu entries.
    #[serde(default, deserialize_with = "lenient_menu_items")]
    pub menu_items: Vec<MenuContribution>,
    /// Named UI components the addon provides.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub ui_components: Vec<String>,
    /// Distribution license.
    #[serde(default = "default_license", deserialize_with = "license_or_default")]
    pub license: String,
    /// Search keywords.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub keywords: Vec<String>,
    /// Project homepage URL.
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub homepage: Option<String>,
    /// Source repository URL.
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub repository: Option<String>,
}

fn default_version() -> String {
    "0.0.0".to_owned()
}

fn default_min_host_version() -> String {
    DEFAULT_MIN_HOST_VERSION.to_owned()
}

fn default_license_tier() -> String {
    "FREE".to_owned()
}

fn default_license() -> String {
    "MIT".to_owned()
}

// Optional fields never reject a manifest. A `null` or a value of the wrong
// type reads as the field's default.

/// Strings pass through; numbers and booleans are rendered as text.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(scalar_text(Value::deserialize(d)?))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(d)?.unwrap_or_default())
}

fn version_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(d)?.unwrap_or_else(default_version))
}

fn min_host_version_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(d)?.unwrap_or_else(default_min_host_version))
}

fn license_tier_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(d)?.unwrap_or_else(default_license_tier))
}

fn license_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(d)?.unwrap_or_else(default_license))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(Value::deserialize(d)?.as_bool().unwrap_or_default())
}

/// String elements of an array. Anything else is dropped.
fn lenient_strings<'de, D, C>(d: D) -> Result<C, D::Error>
where
    D: Deserializer<'de>,
    C: FromIterator<String>,
{
    let items = match Value::deserialize(d)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

/// Object elements of an array, each read as a menu entry.
fn lenient_menu_items<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Vec<MenuContribution>, D::Error> {
    let items = match Value::deserialize(d)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

impl AddonManifest {
    /// Build a manifest from a raw JSON mapping.
    ///
    /// # Errors
    ///
    /// Returns [`AddonError::InvalidManifest`] if the value is not an object,
    /// a required key is missing, or `name` is empty.
    pub fn from_value(raw: serde_json::Value) -> AddonResult<Self> {
        if !raw.is_object() {
            return Err(AddonError::InvalidManifest(
                "manifest must be a JSON object".to_owned(),
            ));
        }
        let manifest: Self = serde_json::from_value(raw)
            .map_err(|e| AddonError::InvalidManifest(e.to_string()))?;
        if manifest.name.trim().is_empty() {
            return Err(AddonError::InvalidManifest("name must not be empty".to_owned()));
        }
        Ok(manifest)
    }

    /// Parse a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`AddonError::InvalidManifest`] if the text is not valid JSON
    /// or fails the checks of [`AddonManifest::from_value`].
    pub fn from_json_str(text: &str) -> AddonResult<Self> {
        let raw: serde_json::Value =
            serde_json::from_str(text).map_err(|e| AddonError::InvalidManifest(e.to_string()))?;
        Self::from_value(raw)
    }

    /// Split the entry point into `(module, type_name)`.
    ///
    /// Returns `None` unless the entry point has exactly two non-empty
    /// dot-separated components.
    #[must_use]
    pub fn entry_point_parts(&self) -> Option<(&str, &str)> {
        split_entry_point(&self.entry_point)
    }
}

/// Split a `module.TypeName` reference into its two components.
#[must_use]
pub fn split_entry_point(entry_point: &str) -> Option<(&str, &str)> {
    let mut parts = entry_point.split('.');
    let module = parts.next()?;
    let type_name = parts.next()?;
    if parts.next().is_some() || module.is_empty() || type_name.is_empty() {
        return None;
    }
    Some((module, type_name))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn minimal() -> serde_json::Value {
        json!({
            "name": "sales_digest",
            "entry_point": "sales_digest.SalesDigest"
        })
    }

    #[test]
    fn test_minimal_manifest_gets_defaults() {
        let m = AddonManifest::from_value(minimal()).unwrap();
        assert_eq!(m.name, "sales_digest");
        assert_eq!(m.version, "0.0.0");
        assert_eq!(m.addon_type, AddonType::Utility);
        assert_eq!(m.min_host_version, DEFAULT_MIN_HOST_VERSION);
        assert_eq!(m.required_license_tier, "FREE");
        assert_eq!(m.license, "MIT");
        assert!(m.max_host_version.is_none());
        assert!(m.dependencies.is_empty());
        assert!(m.permissions.is_empty());
        assert!(m.menu_items.is_empty());
        assert!(m.ui_components.is_empty());
        assert!(m.keywords.is_empty());
    }

    #[test]
    fn test_null_collections_become_empty() {
        let mut raw = minimal();
        raw["menu_items"] = serde_json::Value::Null;
        raw["permissions"] = serde_json::Value::Null;
        raw["dependencies"] = serde_json::Value::Null;
        let m = AddonManifest::from_value(raw).unwrap();
        assert!(m.menu_items.is_empty());
        assert!(m.permissions.is_empty());
        assert!(m.dependencies.is_empty());
    }

    #[test]
    fn test_unknown_addon_type_falls_back_to_utility() {
        for raw_type in ["quantum_widget", "", "UI-EXTENSION", "42"] {
            let mut raw = minimal();
            raw["addon_type"] = json!(raw_type);
            let m = AddonManifest::from_value(raw).unwrap();
            assert_eq!(m.addon_type, AddonType::Utility, "input {raw_type:?}");
        }
    }

    #[test]
    fn test_addon_type_is_case_insensitive() {
        let mut raw = minimal();
        raw["addon_type"] = json!("DATA_PROCESSOR");
        let m = AddonManifest::from_value(raw).unwrap();
        assert_eq!(m.addon_type, AddonType::DataProcessor);
        assert_eq!(m.addon_type.to_string(), "data_processor");
    }

    #[test]
    fn test_null_addon_type_falls_back_to_utility() {
        let mut raw = minimal();
        raw["addon_type"] = serde_json::Value::Null;
        let m = AddonManifest::from_value(raw).unwrap();
        assert_eq!(m.addon_type, AddonType::Utility);
    }

    #[test]
    fn test_non_string_addon_type_falls_back_to_utility() {
        for raw_type in [json!(5), json!(true), json!(["analytics"]), json!({"k": 1})] {
            let mut raw = minimal();
            raw["addon_type"] = raw_type.clone();
            let m = AddonManifest::from_value(raw).unwrap();
            assert_eq!(m.addon_type, AddonType::Utility, "input {raw_type}");
        }
    }

    #[test]
    fn test_odd_optional_values_read_as_defaults() {
        let mut raw = minimal();
        raw["description"] = serde_json::Value::Null;
        raw["author"] = json!({"name": "Ana"});
        raw["version"] = serde_json::Value::Null;
        raw["license"] = json!([]);
        raw["requires_license"] = serde_json::Value::Null;
        raw["max_dataconta_version"] = json!(false);
        raw["homepage"] = serde_json::Value::Null;
        raw["permissions"] = json!("email_send");
        raw["keywords"] = json!(["sales", 3, null]);
        let m = AddonManifest::from_value(raw).unwrap();
        assert_eq!(m.description, "");
        assert_eq!(m.author, "");
        assert_eq!(m.version, "0.0.0");
        assert_eq!(m.license, "MIT");
        assert_eq!(m.required_license_tier, "FREE");
        assert_eq!(m.max_host_version.as_deref(), Some("false"));
        assert!(m.homepage.is_none());
        assert!(m.permissions.is_empty());
        assert_eq!(m.keywords, ["sales"]);
    }

    #[test]
    fn test_numeric_version_is_read_as_text() {
        let mut raw = minimal();
        raw["version"] = json!(2);
        raw["min_dataconta_version"] = json!(3.1);
        let m = AddonManifest::from_value(raw).unwrap();
        assert_eq!(m.version, "2");
        assert_eq!(m.min_host_version, "3.1");
    }

    #[test]
    fn test_odd_menu_item_values_read_as_defaults() {
        let mut raw = minimal();
        raw["menu_items"] = json!([
            {"id": null, "label": "Daily", "action": "send_daily", "requires_confirmation": "yes"},
            {"id": "cfg", "label": 7, "action": "configure", "icon": null},
            "not an item",
            null
        ]);
        let m = AddonManifest::from_value(raw).unwrap();
        assert_eq!(m.menu_items.len(), 2);
        assert_eq!(m.menu_items[0].id, "");
        assert!(!m.menu_items[0].requires_confirmation);
        assert_eq!(m.menu_items[1].label, "7");
        assert!(m.menu_items[1].icon.is_none());
    }

    #[test]
    fn test_host_version_keys() {
        let mut raw = minimal();
        raw["min_dataconta_version"] = json!("1.0.0");
        raw["max_dataconta_version"] = json!("2.0.0");
        raw["requires_license"] = json!("PROFESSIONAL");
        let m = AddonManifest::from_value(raw).unwrap();
        assert_eq!(m.min_host_version, "1.0.0");
        assert_eq!(m.max_host_version.as_deref(), Some("2.0.0"));
        assert_eq!(m.required_license_tier, "PROFESSIONAL");

        let out = serde_json::to_value(&m).unwrap();
        assert_eq!(out["min_dataconta_version"], "1.0.0");
        assert_eq!(out["requires_license"], "PROFESSIONAL");
    }

    #[test]
    fn test_menu_items_parse() {
        let mut raw = minimal();
        raw["menu_items"] = json!([
            {"id": "daily", "label": "Daily", "icon": "📧", "action": "send_daily"},
            {"id": "cfg", "label": "Settings", "action": "configure", "requires_confirmation": true}
        ]);
        let m = AddonManifest::from_value(raw).unwrap();
        assert_eq!(m.menu_items.len(), 2);
        assert_eq!(m.menu_items[0].icon.as_deref(), Some("📧"));
        assert!(!m.menu_items[0].requires_confirmation);
        assert!(m.menu_items[1].requires_confirmation);
        assert!(m.menu_items[1].icon.is_none());
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let raw = json!({"entry_point": "a.B"});
        assert!(matches!(
            AddonManifest::from_value(raw),
            Err(AddonError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let mut raw = minimal();
        raw["name"] = json!("   ");
        assert!(AddonManifest::from_value(raw).is_err());
    }

    #[test]
    fn test_missing_entry_point_is_rejected() {
        let raw = json!({"name": "sales_digest"});
        assert!(AddonManifest::from_value(raw).is_err());
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(AddonManifest::from_value(json!(["name"])).is_err());
        assert!(AddonManifest::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_split_entry_point() {
        assert_eq!(split_entry_point("mod.Type"), Some(("mod", "Type")));
        assert_eq!(split_entry_point("mod"), None);
        assert_eq!(split_entry_point("a.b.C"), None);
        assert_eq!(split_entry_point(".Type"), None);
        assert_eq!(split_entry_point("mod."), None);
        assert_eq!(split_entry_point(""), None);
    }
}
