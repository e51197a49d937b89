//! Ready-made managers over temporary addon roots.

use std::path::Path;
use std::sync::{Arc, Once};

use dataconta_addons::{AddonManager, CatalogLoader, FileSystemRepository, HostServices};

use crate::fixtures::test_config;
use crate::mocks::{RecordingCallbacks, test_catalog};

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A manager over `root` that resolves entry points against the mock
/// catalog, with default host services.
///
/// # Panics
///
/// Panics if the addons or config directory cannot be created.
#[must_use]
pub fn test_manager(root: &Path, host_version: &str) -> AddonManager {
    test_manager_with_host(root, host_version, HostServices::new())
}

/// Like [`test_manager`] with custom host services.
///
/// # Panics
///
/// Panics if the addons or config directory cannot be created.
#[must_use]
pub fn test_manager_with_host(root: &Path, host_version: &str, host: HostServices) -> AddonManager {
    init_test_tracing();
    let config = test_config(root, host_version);
    let repository = FileSystemRepository::new(&config).expect("failed to prepare addons root");
    let loader = CatalogLoader::new(test_catalog(), &config.module_extension);
    AddonManager::new(config, Box::new(repository), Box::new(loader)).with_host(host)
}

/// A manager wired to fresh [`RecordingCallbacks`], returned alongside it.
///
/// # Panics
///
/// Panics if the addons or config directory cannot be created.
#[must_use]
pub fn recording_manager(root: &Path, host_version: &str) -> (AddonManager, RecordingCallbacks) {
    let callbacks = RecordingCallbacks::new();
    let host = HostServices::new().with_callbacks(Arc::new(callbacks.clone()));
    (test_manager_with_host(root, host_version, host), callbacks)
}
