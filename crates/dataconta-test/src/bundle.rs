//! On-disk addon bundle builder.

use std::path::{Path, PathBuf};

use dataconta_addons::MANIFEST_FILE_NAME;
use serde_json::{Value, json};

use crate::mocks::{MOCK_MODULE, RECORDING_ADDON};

/// Builds an addon bundle directory: `manifest.json` plus the source unit
/// named by the entry point.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    dir_name: String,
    manifest: Value,
    write_module: bool,
}

impl BundleBuilder {
    /// A valid bundle named `name` whose entry point is the recording mock.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            dir_name: name.to_owned(),
            manifest: json!({
                "name": name,
                "version": "1.0.0",
                "description": format!("{name} test addon"),
                "author": "DataConta Tests",
                "addon_type": "utility",
                "entry_point": format!("{MOCK_MODULE}.{RECORDING_ADDON}"),
                "min_dataconta_version": "1.0.0",
                "menu_items": []
            }),
            write_module: true,
        }
    }

    /// Put the bundle in a directory whose name differs from the addon name.
    #[must_use]
    pub fn in_dir(mut self, dir_name: &str) -> Self {
        self.dir_name = dir_name.to_owned();
        self
    }

    /// Point the entry point at another exported mock type.
    #[must_use]
    pub fn with_type(self, type_name: &str) -> Self {
        self.with_field("entry_point", json!(format!("{MOCK_MODULE}.{type_name}")))
    }

    /// Set the minimum host version.
    #[must_use]
    pub fn with_min_version(self, version: &str) -> Self {
        self.with_field("min_dataconta_version", json!(version))
    }

    /// Set the maximum host version.
    #[must_use]
    pub fn with_max_version(self, version: &str) -> Self {
        self.with_field("max_dataconta_version", json!(version))
    }

    /// Set the addon type string.
    #[must_use]
    pub fn with_addon_type(self, addon_type: &str) -> Self {
        self.with_field("addon_type", json!(addon_type))
    }

    /// Append a menu contribution.
    #[must_use]
    pub fn with_menu_item(mut self, id: &str, label: &str, action: &str, confirm: bool) -> Self {
        if let Some(items) = self
            .manifest
            .get_mut("menu_items")
            .and_then(Value::as_array_mut)
        {
            items.push(json!({
                "id": id,
                "label": label,
                "icon": "🧪",
                "action": action,
                "requires_confirmation": confirm
            }));
        }
        self
    }

    /// Set or replace any manifest key.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        if let Some(obj) = self.manifest.as_object_mut() {
            obj.insert(key.to_owned(), value);
        }
        self
    }

    /// Remove a manifest key.
    #[must_use]
    pub fn without_field(mut self, key: &str) -> Self {
        if let Some(obj) = self.manifest.as_object_mut() {
            obj.remove(key);
        }
        self
    }

    /// Skip writing the entry point source unit.
    #[must_use]
    pub fn without_module(mut self) -> Self {
        self.write_module = false;
        self
    }

    /// The manifest as it will be written.
    #[must_use]
    pub fn manifest(&self) -> &Value {
        &self.manifest
    }

    /// Write the bundle under `root` and return its directory.
    ///
    /// # Panics
    ///
    /// Panics if the files cannot be written.
    pub fn write(&self, root: &Path) -> PathBuf {
        let dir = root.join(&self.dir_name);
        std::fs::create_dir_all(&dir).expect("failed to create bundle dir");
        let body = serde_json::to_string_pretty(&self.manifest).expect("manifest serializes");
        std::fs::write(dir.join(MANIFEST_FILE_NAME), body).expect("failed to write manifest");

        if self.write_module {
            let module = self
                .manifest
                .get("entry_point")
                .and_then(Value::as_str)
                .and_then(|ep| ep.split_once('.'))
                .map_or(MOCK_MODULE, |(module, _)| module);
            std::fs::write(dir.join(format!("{module}.rs")), "// test addon\n")
                .expect("failed to write module");
        }
        dir
    }
}

/// Write a bundle directory whose manifest is raw text.
///
/// # Panics
///
/// Panics if the files cannot be written.
pub fn write_raw_bundle(root: &Path, dir_name: &str, manifest_text: &str) -> PathBuf {
    let dir = root.join(dir_name);
    std::fs::create_dir_all(&dir).expect("failed to create bundle dir");
    std::fs::write(dir.join(MANIFEST_FILE_NAME), manifest_text).expect("failed to write manifest");
    dir
}
