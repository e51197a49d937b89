//! Test fixtures for common types.

use std::path::Path;

use dataconta_addons::{AddonManifest, AddonSystemConfig, MenuContribution};
use serde_json::json;

use crate::mocks::{MOCK_MODULE, RECORDING_ADDON};

/// Create a test manifest pointing at the recording mock.
///
/// # Panics
///
/// Panics if the manifest parser rejects the fixture.
#[must_use]
pub fn test_manifest(name: &str) -> AddonManifest {
    AddonManifest::from_value(json!({
        "name": name,
        "version": "1.0.0",
        "entry_point": format!("{MOCK_MODULE}.{RECORDING_ADDON}"),
        "min_dataconta_version": "1.0.0"
    }))
    .expect("fixture manifest is valid")
}

/// Create a menu contribution.
#[must_use]
pub fn test_menu_item(id: &str, action: &str) -> MenuContribution {
    MenuContribution {
        id: id.to_owned(),
        label: id.to_owned(),
        icon: None,
        action: action.to_owned(),
        requires_confirmation: false,
        confirmation: None,
        description: None,
    }
}

/// Addon system settings rooted at `root` for the given host version.
#[must_use]
pub fn test_config(root: &Path, host_version: &str) -> AddonSystemConfig {
    AddonSystemConfig::new(root).with_host_version(host_version)
}
