//! Semantic manifest validation.
//!
//! Parsing ([`AddonManifest::from_value`]) is deliberately lenient. This
//! module applies the stricter publishing rules: naming, version format,
//! known permissions, well-formed menu items and bundle hygiene. Discovery
//! only consults it when strict validation is enabled.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::manifest::{AddonManifest, AddonType, MANIFEST_FILE_NAME};
use crate::version::parse_version;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{2,49}$").expect("invalid regex"));
static ENTRY_POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*\.[a-zA-Z_][a-zA-Z0-9_]*$").expect("invalid regex")
});
static SEMVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+(-[a-zA-Z0-9]+)?$").expect("invalid regex"));
static DEPENDENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]+(>=|<=|==|~=|!=)?[0-9.]*$").expect("invalid regex")
});
static SUSPICIOUS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\.tk|\.ml|\.ga|\.cf)(/|$)|bit\.ly|tinyurl\.com|\d+\.\d+\.\d+\.\d+")
        .expect("invalid regex")
});

/// Permissions an addon may request.
pub const KNOWN_PERMISSIONS: &[&str] = &[
    "file_read",
    "file_write",
    "api_access",
    "network_access",
    "system_info",
    "ui_modify",
    "menu_add",
    "data_export",
    "data_import",
    "email_send",
    "notification_send",
];

/// Permissions that deserve a second look before installing.
pub const DANGEROUS_PERMISSIONS: &[&str] = &["file_write", "system_info", "network_access"];

/// Keys a publishable manifest must spell out explicitly.
const REQUIRED_KEYS: &[&str] = &["name", "version", "description", "author", "entry_point"];

/// File extensions a bundle must not ship.
const PROHIBITED_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "sh", "dll", "so", "dylib"];

/// Outcome of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Problems that make the manifest unacceptable.
    pub errors: Vec<String>,
    /// Problems worth reviewing that do not block the addon.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Validate a raw manifest mapping, including keys that parsing would
/// silently default.
#[must_use]
pub fn validate_value(raw: &serde_json::Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let Some(object) = raw.as_object() else {
        report.error("manifest must be a JSON object");
        return report;
    };

    for key in REQUIRED_KEYS {
        if !object.contains_key(*key) {
            report.error(format!("missing required field: {key}"));
        }
    }
    if let Some(addon_type) = object.get("addon_type").and_then(serde_json::Value::as_str)
        && AddonType::parse_known(addon_type).is_none()
    {
        report.warning(format!(
            "unknown addon_type '{addon_type}', treated as utility"
        ));
    }

    match AddonManifest::from_value(raw.clone()) {
        Ok(manifest) => {
            let semantic = validate_manifest(&manifest);
            report.errors.extend(semantic.errors);
            report.warnings.extend(semantic.warnings);
        },
        Err(e) => report.error(e.to_string()),
    }
    report
}

/// Validate a parsed manifest.
#[must_use]
pub fn validate_manifest(manifest: &AddonManifest) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !NAME_RE.is_match(&manifest.name) {
        report.error(format!(
            "invalid addon name '{}': expected snake_case, 3 to 50 characters",
            manifest.name
        ));
    }
    if !ENTRY_POINT_RE.is_match(&manifest.entry_point) {
        report.error(format!(
            "invalid entry point '{}': expected module.TypeName",
            manifest.entry_point
        ));
    }
    if !SEMVER_RE.is_match(&manifest.version) {
        report.error(format!(
            "invalid version '{}': expected x.y.z",
            manifest.version
        ));
    }
    check_host_bounds(manifest, &mut report);

    for dep in &manifest.dependencies {
        if !DEPENDENCY_RE.is_match(dep) {
            report.error(format!("invalid dependency specifier '{dep}'"));
        }
    }
    check_menu_items(manifest, &mut report);

    for permission in &manifest.permissions {
        if !KNOWN_PERMISSIONS.contains(&permission.as_str()) {
            report.error(format!("unknown permission '{permission}'"));
        } else if DANGEROUS_PERMISSIONS.contains(&permission.as_str()) {
            report.warning(format!("requests sensitive permission '{permission}'"));
        }
    }

    for url in [&manifest.homepage, &manifest.repository].into_iter().flatten() {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            report.warning(format!("URL '{url}' is not http(s)"));
        } else if SUSPICIOUS_URL_RE.is_match(url) {
            report.warning(format!("suspicious URL '{url}'"));
        }
    }

    report
}

fn check_host_bounds(manifest: &AddonManifest, report: &mut ValidationReport) {
    let min = parse_version(&manifest.min_host_version);
    if min.is_none() {
        report.error(format!(
            "invalid min_dataconta_version '{}'",
            manifest.min_host_version
        ));
    }
    if let Some(raw_max) = &manifest.max_host_version {
        match parse_version(raw_max) {
            None => report.error(format!("invalid max_dataconta_version '{raw_max}'")),
            Some(max) => {
                if min.is_some_and(|min| min > max) {
                    report.error(format!(
                        "min_dataconta_version {} is greater than max_dataconta_version {raw_max}",
                        manifest.min_host_version
                    ));
                }
            },
        }
    }
}

fn check_menu_items(manifest: &AddonManifest, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (i, item) in manifest.menu_items.iter().enumerate() {
        for (field, value) in [("id", &item.id), ("label", &item.label), ("action", &item.action)]
        {
            if value.trim().is_empty() {
                report.error(format!("menu item {i} is missing required field '{field}'"));
            }
        }
        if !item.id.is_empty() && !seen.insert(item.id.as_str()) {
            report.error(format!("duplicate menu item id '{}'", item.id));
        }
    }
}

/// Validate a bundle directory: its manifest plus the files it ships.
#[must_use]
pub fn validate_bundle(location: &Path, module_extension: &str) -> ValidationReport {
    let manifest_path = location.join(MANIFEST_FILE_NAME);
    let raw = match std::fs::read_to_string(&manifest_path) {
        Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(raw) => raw,
            Err(e) => {
                let mut report = ValidationReport::default();
                report.error(format!("{MANIFEST_FILE_NAME} is not valid JSON: {e}"));
                return report;
            },
        },
        Err(e) => {
            let mut report = ValidationReport::default();
            report.error(format!("cannot read {}: {e}", manifest_path.display()));
            return report;
        },
    };

    let mut report = validate_value(&raw);

    if let Some(entry_point) = raw.get("entry_point").and_then(serde_json::Value::as_str)
        && let Some((module, _)) = crate::manifest::split_entry_point(entry_point)
    {
        let source = location.join(format!("{module}.{module_extension}"));
        if !source.is_file() {
            report.error(format!("missing source unit {module}.{module_extension}"));
        }
    }

    if let Ok(entries) = std::fs::read_dir(location) {
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let prohibited_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| PROHIBITED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if prohibited_ext || matches!(name.as_str(), ".git" | ".svn") {
                report.error(format!("bundle contains prohibited file '{name}'"));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn good() -> serde_json::Value {
        json!({
            "name": "email_reports",
            "version": "1.0.0",
            "description": "Sends reports",
            "author": "DataConta",
            "addon_type": "notification",
            "entry_point": "email_reports_addon.EmailReportsAddon",
            "min_dataconta_version": "3.0.0",
            "dependencies": ["lettre>=0.11"],
            "permissions": ["email_send", "data_export"],
            "menu_items": [
                {"id": "daily", "label": "Daily", "action": "send_daily_report"},
                {"id": "monthly", "label": "Monthly", "action": "send_monthly_report"}
            ],
            "homepage": "https://dataconta.example.com"
        })
    }

    #[test]
    fn test_good_manifest_is_valid() {
        let report = validate_value(&good());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_required_fields() {
        let report = validate_value(&json!({"name": "abc", "entry_point": "a.B"}));
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("version")));
        assert!(report.errors.iter().any(|e| e.contains("author")));
    }

    #[test]
    fn test_name_and_entry_point_rules() {
        let mut raw = good();
        raw["name"] = json!("Email-Reports");
        raw["entry_point"] = json!("email.reports.Addon");
        let report = validate_value(&raw);
        assert!(report.errors.iter().any(|e| e.contains("invalid addon name")));
        assert!(report.errors.iter().any(|e| e.contains("invalid entry point")));
    }

    #[test]
    fn test_version_rules() {
        let mut raw = good();
        raw["version"] = json!("1.0");
        raw["min_dataconta_version"] = json!("4.0.0");
        raw["max_dataconta_version"] = json!("3.5.0");
        let report = validate_value(&raw);
        assert!(report.errors.iter().any(|e| e.contains("invalid version")));
        assert!(report.errors.iter().any(|e| e.contains("greater than")));
    }

    #[test]
    fn test_menu_item_rules() {
        let mut raw = good();
        raw["menu_items"] = json!([
            {"id": "a", "label": "A", "action": "run"},
            {"id": "a", "label": "Again", "action": "run"},
            {"id": "b", "action": "run"}
        ]);
        let report = validate_value(&raw);
        assert!(report.errors.iter().any(|e| e.contains("duplicate menu item id 'a'")));
        assert!(report.errors.iter().any(|e| e.contains("menu item 2") && e.contains("label")));
    }

    #[test]
    fn test_permissions() {
        let mut raw = good();
        raw["permissions"] = json!(["file_write", "launch_missiles"]);
        let report = validate_value(&raw);
        assert!(report.errors.iter().any(|e| e.contains("launch_missiles")));
        assert!(report.warnings.iter().any(|w| w.contains("file_write")));
    }

    #[test]
    fn test_dependencies_and_urls() {
        let mut raw = good();
        raw["dependencies"] = json!(["ok_dep==1.2", "bad dep"]);
        raw["repository"] = json!("http://10.0.0.1/addon.git");
        raw["homepage"] = json!("ftp://example.com");
        let report = validate_value(&raw);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("bad dep"));
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_unknown_type_is_warning_only() {
        let mut raw = good();
        raw["addon_type"] = json!("hologram");
        let report = validate_value(&raw);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.contains("hologram")));
    }

    #[test]
    fn test_validate_bundle_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE_NAME),
            serde_json::to_string(&good()).unwrap(),
        )
        .unwrap();
        let report = validate_bundle(dir.path(), "rs");
        assert!(report.errors.iter().any(|e| e.contains("missing source unit")));

        std::fs::write(dir.path().join("email_reports_addon.rs"), "").unwrap();
        assert!(validate_bundle(dir.path(), "rs").is_valid());

        std::fs::write(dir.path().join("install.sh"), "rm -rf /").unwrap();
        let report = validate_bundle(dir.path(), "rs");
        assert!(report.errors.iter().any(|e| e.contains("install.sh")));
    }

    #[test]
    fn test_validate_bundle_without_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(!validate_bundle(dir.path(), "rs").is_valid());
    }
}
