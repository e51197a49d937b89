//! End-to-end addon lifecycle tests over real bundle directories.

use dataconta_addons::{
    ActionParams, AddonError, AddonStatus, AddonType, InfoStatus, lock_addon,
};
use dataconta_test::{
    BundleBuilder, FAILING_INIT_ADDON, FAILING_SHUTDOWN_ADDON, PANICKING_ADDON,
    PANICKING_CONSTRUCTOR, recording_manager, test_manager, write_raw_bundle,
};
use serde_json::json;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

#[test]
fn test_scan_excludes_broken_bundles() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("good_addon").write(dir.path());
    BundleBuilder::new("no_module").without_module().write(dir.path());
    BundleBuilder::new("bad_entry")
        .with_field("entry_point", json!("nodots"))
        .write(dir.path());
    BundleBuilder::new("nameless").without_field("name").write(dir.path());
    write_raw_bundle(dir.path(), "garbage", "{ not json");
    std::fs::create_dir_all(dir.path().join("empty_dir")).unwrap();

    let manager = test_manager(dir.path(), "1.5.0");
    assert_eq!(manager.scan(), 1);
    let names: Vec<String> = manager
        .discovered_addons()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, ["good_addon"]);
}

#[test]
fn test_scan_keeps_first_of_duplicate_names() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("twin")
        .in_dir("a_twin")
        .with_field("version", json!("1.0.0"))
        .write(dir.path());
    BundleBuilder::new("twin")
        .in_dir("b_twin")
        .with_field("version", json!("2.0.0"))
        .write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    assert_eq!(manager.scan(), 1);
    assert_eq!(manager.discovered_addons()[0].version, "1.0.0");
}

#[test]
fn test_load_uses_the_bundle_scan_accepted() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("twin")
        .in_dir("a_twin")
        .without_module()
        .write(dir.path());
    BundleBuilder::new("twin")
        .in_dir("b_twin")
        .with_field("version", json!("2.0.0"))
        .write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    assert_eq!(manager.scan(), 1);
    assert!(manager.try_load("twin").is_ok());
    let info = manager.get_addon_info("twin").unwrap();
    assert_eq!(info.version, "2.0.0");
}

#[test]
fn test_unknown_addon_type_defaults_to_utility() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("odd_type")
        .with_addon_type("QUANTUM")
        .write(dir.path());
    BundleBuilder::new("mailer")
        .with_addon_type("NOTIFICATION")
        .write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    assert_eq!(manager.scan(), 2);
    let info = manager.get_addon_info("odd_type").unwrap();
    assert_eq!(info.addon_type, AddonType::Utility);
    let info = manager.get_addon_info("mailer").unwrap();
    assert_eq!(info.addon_type, AddonType::Notification);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_compatible_addon_loads_and_enables() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("hello_addon")
        .with_min_version("1.0.0")
        .write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    assert_eq!(manager.scan(), 1);
    assert!(manager.load("hello_addon"));
    assert_eq!(manager.get_loaded_addons(), ["hello_addon"]);
    assert!(manager.enable("hello_addon"));

    let addon = manager.registry().get("hello_addon").unwrap();
    assert!(lock_addon(&addon).is_active());
    assert!(manager.is_addon_active("hello_addon"));
}

#[test]
fn test_incompatible_addon_is_not_loaded() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("future_addon")
        .with_min_version("2.0.0")
        .write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    assert_eq!(manager.scan(), 1);
    assert!(!manager.load("future_addon"));
    assert!(manager.get_loaded_addons().is_empty());
    assert!(!manager.enable("future_addon"));
}

#[test]
fn test_failed_initialize_allows_retry() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("flaky_addon")
        .with_type(FAILING_INIT_ADDON)
        .write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(!manager.enable("flaky_addon"));

    let addon = manager.registry().get("flaky_addon").unwrap();
    assert_eq!(lock_addon(&addon).status(), AddonStatus::Error);
    assert!(lock_addon(&addon).last_error().is_some());

    // The retry runs initialize again and fails the same way, without being
    // short-circuited.
    assert!(!manager.enable("flaky_addon"));
    assert_eq!(lock_addon(&addon).status(), AddonStatus::Error);
}

#[test]
fn test_initialize_panic_is_contained() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("boom_addon")
        .with_type(PANICKING_ADDON)
        .write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(!manager.enable("boom_addon"));
    let info = manager.get_addon_info("boom_addon").unwrap();
    assert_eq!(info.status, InfoStatus::Error);
}

#[test]
fn test_constructor_panic_fails_load() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("ctor_addon")
        .with_type(PANICKING_CONSTRUCTOR)
        .write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(!manager.load("ctor_addon"));
    assert!(matches!(
        manager.try_load("ctor_addon"),
        Err(AddonError::LoadFailed { .. })
    ));
    assert!(manager.get_loaded_addons().is_empty());
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn test_load_twice_keeps_one_entry() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("hello_addon").write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(manager.load("hello_addon"));
    assert!(manager.load("hello_addon"));
    assert_eq!(manager.registry().len(), 1);
}

#[test]
fn test_unload_of_unknown_name_is_noop() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("hello_addon").write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(manager.enable("hello_addon"));
    assert!(manager.unload("never_registered"));
    assert_eq!(manager.get_loaded_addons(), ["hello_addon"]);
    assert!(manager.is_addon_active("hello_addon"));
}

#[test]
fn test_unload_shuts_down_active_addon() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("hello_addon").write(dir.path());

    let (manager, callbacks) = recording_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(manager.enable("hello_addon"));
    assert!(manager.unload("hello_addon"));

    assert_eq!(
        callbacks.message_titles(),
        ["initialize:hello_addon", "shutdown:hello_addon"]
    );
    assert!(manager.get_loaded_addons().is_empty());
}

#[test]
fn test_failed_shutdown_still_unloads() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("sticky_addon")
        .with_type(FAILING_SHUTDOWN_ADDON)
        .write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(manager.enable("sticky_addon"));
    assert!(!manager.disable("sticky_addon"));
    assert!(manager.unload("sticky_addon"));
    assert!(manager.get_loaded_addons().is_empty());
}

// ---------------------------------------------------------------------------
// Actions and config
// ---------------------------------------------------------------------------

#[test]
fn test_action_dispatch_requires_activation() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("hello_addon").write(dir.path());

    let (manager, callbacks) = recording_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(manager.load("hello_addon"));

    let params = ActionParams::new();
    assert!(manager.execute_action("hello_addon", "ping", &params).is_none());

    assert!(manager.enable("hello_addon"));
    assert_eq!(
        manager.execute_action("hello_addon", "ping", &params),
        Some(json!("pong"))
    );
    assert!(manager.execute_action("hello_addon", "missing", &params).is_none());
    assert!(manager.execute_action("hello_addon", "fail", &params).is_none());
    assert!(manager.execute_action("hello_addon", "panic", &params).is_none());
    assert!(callbacks.message_titles().contains(&"ping:hello_addon".to_owned()));
}

#[test]
fn test_configure_notifies_loaded_addon() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("hello_addon").write(dir.path());

    let (manager, callbacks) = recording_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(manager.enable("hello_addon"));

    let mut config = dataconta_addons::ConfigMap::new();
    config.insert("greeting".into(), json!("hola"));
    assert!(manager.configure("hello_addon", &config));
    assert!(callbacks.message_titles().contains(&"config:hello_addon".to_owned()));
    assert!(dir.path().join("config").join("hello_addon.json").is_file());
    assert_eq!(manager.addon_config("hello_addon"), config);
}

#[test]
fn test_system_info_counts() {
    let dir = TempDir::new().unwrap();
    BundleBuilder::new("one_addon").write(dir.path());
    BundleBuilder::new("two_addon").write(dir.path());
    BundleBuilder::new("three_addon").write(dir.path());

    let manager = test_manager(dir.path(), "1.5.0");
    manager.scan();
    assert!(manager.enable("one_addon"));
    assert!(manager.load("two_addon"));

    let info = manager.system_info();
    assert_eq!(info.discovered, 3);
    assert_eq!(info.loaded, 2);
    assert_eq!(info.active, 1);
    assert_eq!(info.host_version, "1.5.0");
}
