//! Host services wired for a terminal session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use dataconta_addons::{
    AddonCatalog, AddonManager, AddonMenuIntegration, AddonSystem, AddonSystemConfig,
    HostCallbacks, HostServices, MenuConfig, MenuContribution,
};
use dataconta_config::Config;
use tracing::{debug, info};

use crate::commands::OutputFormat;
use crate::theme::Theme;

/// Prints addon messages to the terminal.
///
/// In JSON mode everything goes to stderr so stdout stays machine-readable.
pub(crate) struct TerminalCallbacks {
    format: OutputFormat,
}

impl TerminalCallbacks {
    pub(crate) fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn emit(&self, line: &str) {
        match self.format {
            OutputFormat::Pretty => println!("{line}"),
            OutputFormat::Json => eprintln!("{line}"),
        }
    }
}

impl HostCallbacks for TerminalCallbacks {
    fn show_message(&self, title: &str, body: &str) {
        self.emit(&Theme::header(title));
        for line in body.lines() {
            self.emit(&format!("  {line}"));
        }
    }

    fn show_error(&self, title: &str, body: &str) {
        eprintln!("{}", Theme::error(&format!("{title}: {body}")));
    }

    fn add_menu_item(&self, item: &MenuContribution) -> bool {
        debug!(id = %item.id, action = %item.action, "menu item offered at runtime");
        true
    }
}

/// Everything a command needs: resolved config plus a scanned manager.
pub(crate) struct Session {
    pub(crate) config: Config,
    pub(crate) loaded_files: Vec<String>,
    pub(crate) manager: Arc<AddonManager>,
    pub(crate) format: OutputFormat,
}

/// Addon modules compiled into this binary.
fn builtin_catalog() -> AddonCatalog {
    let mut catalog = AddonCatalog::new();
    dataconta_email_reports::register(&mut catalog);
    catalog
}

fn system_config(config: &Config) -> AddonSystemConfig {
    let mut system = AddonSystemConfig::new(&config.addons.path)
        .with_host_version(config.addons.host_version.clone())
        .with_strict_validation(config.addons.strict_validation);
    system
        .module_extension
        .clone_from(&config.addons.module_extension);
    system
}

impl Session {
    /// Build the addon system described by `config` and scan for bundles.
    pub(crate) fn open(
        config: Config,
        loaded_files: Vec<String>,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        let host = HostServices::new().with_callbacks(Arc::new(TerminalCallbacks::new(format)));
        let manager = AddonSystem::build(system_config(&config), host, builtin_catalog())
            .with_context(|| {
                format!(
                    "failed to open addons directory {}",
                    config.addons.path.display()
                )
            })?;
        Ok(Self {
            config,
            loaded_files,
            manager,
            format,
        })
    }

    /// Enable every discovered addon that fits this host. Returns how many
    /// are active afterwards.
    pub(crate) fn enable_compatible(&self) -> usize {
        for manifest in self.manager.discovered_addons() {
            if self.manager.is_compatible(&manifest) {
                self.manager.enable(&manifest.name);
            }
        }
        let active = self.manager.get_active_addons().len();
        info!(active, "enabled compatible addons");
        active
    }

    /// Path of the host menu file.
    pub(crate) fn menu_path(&self) -> PathBuf {
        self.config.menu.config_file.clone()
    }

    /// Load the host menu and merge in the menus of every active addon.
    pub(crate) fn menu(&self) -> anyhow::Result<AddonMenuIntegration> {
        let path = self.menu_path();
        let host_menu = MenuConfig::load_or_init(&path, &MenuConfig::default_host_menu())
            .with_context(|| format!("failed to load menu config {}", path.display()))?;
        let integration = AddonMenuIntegration::new(Arc::new(host_menu), Arc::clone(&self.manager));
        integration.load_addon_menus();
        Ok(integration)
    }
}
