//! Execution context handed to every addon.
//!
//! The host owns a single [`HostServices`] aggregate: opaque window and
//! controller handles, optional business services and the UI callbacks. The
//! manager wraps it in a per-addon [`AddonContext`] that adds the addon's
//! persisted config, its manifest and a name-tagged logger.
//!
//! When the host swaps its services the manager builds a fresh
//! `HostServices`, and contexts handed out earlier keep pointing at the old
//! one. Addons must therefore read context fields at the time of use and not
//! copy them into their own state beyond a single action invocation.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::AddonResult;
use crate::manifest::{AddonManifest, MenuContribution};

/// String-keyed JSON mapping used for app and addon configuration.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Opaque host object (main window, controller). Addons may downcast it if
/// they know the host's concrete types; the addon system never looks inside.
pub type HostHandle = Arc<dyn Any + Send + Sync>;

/// Business indicators computed by the host.
pub trait KpiService: Send + Sync {
    /// Compute the indicator set, optionally restricted to one year.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot produce the figures.
    fn kpis(&self, year: Option<i32>) -> AddonResult<serde_json::Value>;
}

/// Host-side export of tabular data.
pub trait ExportService: Send + Sync {
    /// Export `data` in `format` (`csv`, `xlsx`, `json`) to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the export fails.
    fn export(
        &self,
        format: &str,
        data: &serde_json::Value,
        destination: &Path,
    ) -> AddonResult<PathBuf>;
}

/// Key-value file storage exposed by the host.
pub trait FileStorage: Send + Sync {
    /// Read the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure. A missing key is `Ok(None)`.
    fn read(&self, key: &str) -> AddonResult<Option<Vec<u8>>>;

    /// Store `data` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    fn write(&self, key: &str, data: &[u8]) -> AddonResult<()>;
}

/// UI callbacks the host exposes to addons.
pub trait HostCallbacks: Send + Sync {
    /// Show an informational message.
    fn show_message(&self, title: &str, body: &str);

    /// Show an error message.
    fn show_error(&self, title: &str, body: &str);

    /// Ask the host for an extra menu entry. The host may refuse.
    fn add_menu_item(&self, item: &MenuContribution) -> bool;
}

/// Callbacks used when the host has no UI attached: everything goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCallbacks;

impl HostCallbacks for LoggingCallbacks {
    fn show_message(&self, title: &str, body: &str) {
        info!(title, body, "Addon message");
    }

    fn show_error(&self, title: &str, body: &str) {
        error!(title, body, "Addon error message");
    }

    fn add_menu_item(&self, item: &MenuContribution) -> bool {
        info!(item_id = %item.id, action = %item.action, "Addon requested menu item");
        true
    }
}

/// Host-owned services shared by every addon context.
#[derive(Clone)]
pub struct HostServices {
    main_window: Option<HostHandle>,
    controller: Option<HostHandle>,
    kpi_service: Option<Arc<dyn KpiService>>,
    export_service: Option<Arc<dyn ExportService>>,
    file_storage: Option<Arc<dyn FileStorage>>,
    app_config: ConfigMap,
    callbacks: Arc<dyn HostCallbacks>,
}

impl HostServices {
    /// Create an empty service set with logging callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            main_window: None,
            controller: None,
            kpi_service: None,
            export_service: None,
            file_storage: None,
            app_config: ConfigMap::new(),
            callbacks: Arc::new(LoggingCallbacks),
        }
    }

    /// Attach the main window handle.
    #[must_use]
    pub fn with_main_window(mut self, handle: HostHandle) -> Self {
        self.main_window = Some(handle);
        self
    }

    /// Attach the controller handle.
    #[must_use]
    pub fn with_controller(mut self, handle: HostHandle) -> Self {
        self.controller = Some(handle);
        self
    }

    /// Expose the KPI service.
    #[must_use]
    pub fn with_kpi_service(mut self, service: Arc<dyn KpiService>) -> Self {
        self.kpi_service = Some(service);
        self
    }

    /// Expose the export service.
    #[must_use]
    pub fn with_export_service(mut self, service: Arc<dyn ExportService>) -> Self {
        self.export_service = Some(service);
        self
    }

    /// Expose file storage.
    #[must_use]
    pub fn with_file_storage(mut self, storage: Arc<dyn FileStorage>) -> Self {
        self.file_storage = Some(storage);
        self
    }

    /// Set the application configuration visible to addons.
    #[must_use]
    pub fn with_app_config(mut self, config: ConfigMap) -> Self {
        self.app_config = config;
        self
    }

    /// Replace the UI callbacks.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: Arc<dyn HostCallbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Application configuration.
    #[must_use]
    pub fn app_config(&self) -> &ConfigMap {
        &self.app_config
    }
}

impl Default for HostServices {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices")
            .field("main_window", &self.main_window.is_some())
            .field("controller", &self.controller.is_some())
            .field("kpi_service", &self.kpi_service.is_some())
            .field("export_service", &self.export_service.is_some())
            .field("file_storage", &self.file_storage.is_some())
            .field("app_config_keys", &self.app_config.len())
            .finish_non_exhaustive()
    }
}

/// Logger handed to an addon. Every event carries the addon name.
#[derive(Debug, Clone)]
pub struct AddonLogger {
    addon: Arc<str>,
}

impl AddonLogger {
    /// Create a logger for `addon`.
    #[must_use]
    pub fn new(addon: &str) -> Self {
        Self {
            addon: Arc::from(addon),
        }
    }

    /// Log at debug level.
    pub fn debug(&self, message: &str) {
        debug!(addon = %self.addon, "{message}");
    }

    /// Log at info level.
    pub fn info(&self, message: &str) {
        info!(addon = %self.addon, "{message}");
    }

    /// Log at warn level.
    pub fn warn(&self, message: &str) {
        warn!(addon = %self.addon, "{message}");
    }

    /// Log at error level.
    pub fn error(&self, message: &str) {
        error!(addon = %self.addon, "{message}");
    }
}

/// Context passed to an addon when it is constructed.
///
/// Cheap to clone. Host-owned fields are read-only through this type.
#[derive(Clone)]
pub struct AddonContext {
    host: Arc<HostServices>,
    manifest: Arc<AddonManifest>,
    bundle_dir: PathBuf,
    addon_config: ConfigMap,
    logger: AddonLogger,
}

impl AddonContext {
    /// Create a context for the addon described by `manifest`.
    #[must_use]
    pub fn new(host: Arc<HostServices>, manifest: AddonManifest, bundle_dir: PathBuf) -> Self {
        let logger = AddonLogger::new(&manifest.name);
        Self {
            host,
            manifest: Arc::new(manifest),
            bundle_dir,
            addon_config: ConfigMap::new(),
            logger,
        }
    }

    /// Create a context with default host services and no bundle directory.
    #[must_use]
    pub fn for_testing(manifest: AddonManifest) -> Self {
        Self::new(Arc::new(HostServices::new()), manifest, PathBuf::new())
    }

    /// Set the addon's persisted configuration.
    #[must_use]
    pub fn with_addon_config(mut self, config: ConfigMap) -> Self {
        self.addon_config = config;
        self
    }

    /// Manifest of the addon this context belongs to.
    #[must_use]
    pub fn manifest(&self) -> &AddonManifest {
        &self.manifest
    }

    /// Directory of the addon's bundle.
    #[must_use]
    pub fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }

    /// Addon-scoped logger.
    #[must_use]
    pub fn logger(&self) -> &AddonLogger {
        &self.logger
    }

    /// The addon's persisted configuration.
    #[must_use]
    pub fn addon_config(&self) -> &ConfigMap {
        &self.addon_config
    }

    /// Application configuration.
    #[must_use]
    pub fn app_config(&self) -> &ConfigMap {
        &self.host.app_config
    }

    /// Main window handle, if the host provided one.
    #[must_use]
    pub fn main_window(&self) -> Option<&HostHandle> {
        self.host.main_window.as_ref()
    }

    /// Controller handle, if the host provided one.
    #[must_use]
    pub fn controller(&self) -> Option<&HostHandle> {
        self.host.controller.as_ref()
    }

    /// KPI service, if exposed.
    #[must_use]
    pub fn kpi_service(&self) -> Option<&Arc<dyn KpiService>> {
        self.host.kpi_service.as_ref()
    }

    /// Export service, if exposed.
    #[must_use]
    pub fn export_service(&self) -> Option<&Arc<dyn ExportService>> {
        self.host.export_service.as_ref()
    }

    /// File storage, if exposed.
    #[must_use]
    pub fn file_storage(&self) -> Option<&Arc<dyn FileStorage>> {
        self.host.file_storage.as_ref()
    }

    /// Show an informational message through the host.
    pub fn show_message(&self, title: &str, body: &str) {
        self.host.callbacks.show_message(title, body);
    }

    /// Show an error message through the host.
    pub fn show_error(&self, title: &str, body: &str) {
        self.host.callbacks.show_error(title, body);
    }

    /// Ask the host for an extra menu entry.
    #[must_use]
    pub fn add_menu_item(&self, item: &MenuContribution) -> bool {
        self.host.callbacks.add_menu_item(item)
    }
}

impl fmt::Debug for AddonContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonContext")
            .field("addon", &self.manifest.name)
            .field("bundle_dir", &self.bundle_dir)
            .field("addon_config_keys", &self.addon_config.len())
            .field("host", &self.host)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder(Mutex<Vec<String>>);

    impl HostCallbacks for Recorder {
        fn show_message(&self, title: &str, body: &str) {
            self.0.lock().unwrap().push(format!("msg:{title}:{body}"));
        }

        fn show_error(&self, title: &str, body: &str) {
            self.0.lock().unwrap().push(format!("err:{title}:{body}"));
        }

        fn add_menu_item(&self, item: &MenuContribution) -> bool {
            self.0.lock().unwrap().push(format!("menu:{}", item.id));
            false
        }
    }

    fn manifest() -> AddonManifest {
        AddonManifest::from_json_str(r#"{"name": "ctx_test", "entry_point": "m.T"}"#).unwrap()
    }

    #[test]
    fn test_callbacks_reach_host() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let host = HostServices::new().with_callbacks(recorder.clone());
        let ctx = AddonContext::new(Arc::new(host), manifest(), PathBuf::from("/tmp/x"));

        ctx.show_message("Hi", "there");
        ctx.show_error("Oops", "bad");
        let accepted = ctx.add_menu_item(&MenuContribution {
            id: "extra".into(),
            ..MenuContribution::default()
        });

        assert!(!accepted);
        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen, vec!["msg:Hi:there", "err:Oops:bad", "menu:extra"]);
    }

    #[test]
    fn test_optional_services_absent_by_default() {
        let ctx = AddonContext::for_testing(manifest());
        assert!(ctx.kpi_service().is_none());
        assert!(ctx.export_service().is_none());
        assert!(ctx.file_storage().is_none());
        assert!(ctx.main_window().is_none());
        assert!(ctx.controller().is_none());
        assert!(ctx.app_config().is_empty());
        assert!(ctx.addon_config().is_empty());
    }

    #[test]
    fn test_host_handles_pass_through() {
        let window: HostHandle = Arc::new(String::from("main-window"));
        let host = HostServices::new().with_main_window(window);
        let ctx = AddonContext::new(Arc::new(host), manifest(), PathBuf::new());
        let handle = ctx.main_window().unwrap();
        assert_eq!(handle.downcast_ref::<String>().unwrap(), "main-window");
    }

    #[test]
    fn test_addon_config_and_app_config() {
        let mut app = ConfigMap::new();
        app.insert("version".into(), "3.0.0".into());
        let mut own = ConfigMap::new();
        own.insert("recipients".into(), serde_json::json!(["a@b.c"]));

        let host = HostServices::new().with_app_config(app);
        let ctx = AddonContext::new(Arc::new(host), manifest(), PathBuf::new())
            .with_addon_config(own);

        assert_eq!(ctx.app_config()["version"], "3.0.0");
        assert_eq!(ctx.addon_config()["recipients"][0], "a@b.c");
        assert_eq!(ctx.manifest().name, "ctx_test");
    }

    #[test]
    fn test_logging_callbacks_accept_menu_items() {
        assert!(LoggingCallbacks.add_menu_item(&MenuContribution::default()));
    }
}
