//! Mock implementations for testing.

use std::sync::{Arc, Mutex, PoisonError};

use dataconta_addons::{
    ActionTable, Addon, AddonCatalog, AddonContext, AddonError, AddonManifest, AddonModule,
    AddonResult, ConfigMap, HostCallbacks, MenuContribution, action_handler,
};
use serde_json::{Value, json};

/// Module key the mock addons are registered under.
pub const MOCK_MODULE: &str = "mock";
/// Well-behaved addon recording its lifecycle through host callbacks.
pub const RECORDING_ADDON: &str = "RecordingAddon";
/// Addon whose `initialize` returns an error.
pub const FAILING_INIT_ADDON: &str = "FailingInitAddon";
/// Addon whose `initialize` panics.
pub const PANICKING_ADDON: &str = "PanickingAddon";
/// Addon whose constructor panics.
pub const PANICKING_CONSTRUCTOR: &str = "PanickingConstructor";
/// Addon whose `shutdown` returns an error.
pub const FAILING_SHUTDOWN_ADDON: &str = "FailingShutdownAddon";

/// Host callbacks that capture every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingCallbacks {
    messages: Arc<Mutex<Vec<(String, String)>>>,
    errors: Arc<Mutex<Vec<(String, String)>>>,
    menu_items: Arc<Mutex<Vec<MenuContribution>>>,
    refuse_menu_items: bool,
}

impl RecordingCallbacks {
    /// Create callbacks that accept menu item requests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every `add_menu_item` request.
    #[must_use]
    pub fn refusing_menu_items(mut self) -> Self {
        self.refuse_menu_items = true;
        self
    }

    /// Captured `show_message` calls as `(title, body)`.
    #[must_use]
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured `show_error` calls as `(title, body)`.
    #[must_use]
    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured `add_menu_item` requests.
    #[must_use]
    pub fn menu_items(&self) -> Vec<MenuContribution> {
        self.menu_items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Titles of captured messages, in call order.
    #[must_use]
    pub fn message_titles(&self) -> Vec<String> {
        self.messages().into_iter().map(|(title, _)| title).collect()
    }
}

impl HostCallbacks for RecordingCallbacks {
    fn show_message(&self, title: &str, body: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_owned(), body.to_owned()));
    }

    fn show_error(&self, title: &str, body: &str) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_owned(), body.to_owned()));
    }

    fn add_menu_item(&self, item: &MenuContribution) -> bool {
        if self.refuse_menu_items {
            return false;
        }
        self.menu_items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item.clone());
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Normal,
    FailInit,
    PanicInit,
    FailShutdown,
}

/// Mock addon driven by a [`Behavior`].
///
/// Lifecycle calls are reported through `show_message` with titles
/// `initialize:<name>` and `shutdown:<name>`. Actions:
///
/// - `ping`: shows `ping:<name>` and returns `"pong"`
/// - `echo`: returns its params
/// - `fail`: returns an error
/// - `panic`: panics
/// - `export`: shows `export:<name>`, shared by every mock so namespacing
///   can be tested
pub struct MockAddon {
    ctx: AddonContext,
    behavior: Behavior,
}

impl MockAddon {
    fn new(ctx: AddonContext, behavior: Behavior) -> Self {
        Self { ctx, behavior }
    }

    fn name(&self) -> &str {
        &self.ctx.manifest().name
    }
}

impl Addon for MockAddon {
    fn manifest(&self) -> &AddonManifest {
        self.ctx.manifest()
    }

    fn initialize(&mut self) -> AddonResult<()> {
        match self.behavior {
            Behavior::FailInit => Err(AddonError::ActionFailed("initialize refused".into())),
            Behavior::PanicInit => panic!("initialize exploded"),
            Behavior::Normal | Behavior::FailShutdown => {
                self.ctx
                    .show_message(&format!("initialize:{}", self.name()), "ok");
                Ok(())
            },
        }
    }

    fn shutdown(&mut self) -> AddonResult<()> {
        self.ctx
            .show_message(&format!("shutdown:{}", self.name()), "ok");
        if self.behavior == Behavior::FailShutdown {
            return Err(AddonError::ActionFailed("shutdown refused".into()));
        }
        Ok(())
    }

    fn actions(&self) -> ActionTable {
        let mut table = ActionTable::new();
        let ctx = self.ctx.clone();
        table.insert(
            "ping".into(),
            action_handler(move |_| {
                ctx.show_message(&format!("ping:{}", ctx.manifest().name), "pong");
                Ok(json!("pong"))
            }),
        );
        let ctx = self.ctx.clone();
        table.insert(
            "export".into(),
            action_handler(move |_| {
                ctx.show_message(&format!("export:{}", ctx.manifest().name), "done");
                Ok(Value::Bool(true))
            }),
        );
        table.insert(
            "echo".into(),
            action_handler(|params| Ok(Value::Object(params.clone()))),
        );
        table.insert(
            "fail".into(),
            action_handler(|_| Err(AddonError::ActionFailed("requested failure".into()))),
        );
        table.insert("panic".into(), action_handler(|_| panic!("action exploded")));
        table
    }

    fn config_schema(&self) -> Option<Value> {
        Some(json!({"type": "object", "properties": {"greeting": {"type": "string"}}}))
    }

    fn handle_config_change(&mut self, config: &ConfigMap) -> AddonResult<()> {
        self.ctx.show_message(
            &format!("config:{}", self.name()),
            &Value::Object(config.clone()).to_string(),
        );
        Ok(())
    }
}

fn build_recording(ctx: AddonContext) -> AddonResult<Box<dyn Addon>> {
    Ok(Box::new(MockAddon::new(ctx, Behavior::Normal)))
}

fn build_failing_init(ctx: AddonContext) -> AddonResult<Box<dyn Addon>> {
    Ok(Box::new(MockAddon::new(ctx, Behavior::FailInit)))
}

fn build_panicking(ctx: AddonContext) -> AddonResult<Box<dyn Addon>> {
    Ok(Box::new(MockAddon::new(ctx, Behavior::PanicInit)))
}

fn build_failing_shutdown(ctx: AddonContext) -> AddonResult<Box<dyn Addon>> {
    Ok(Box::new(MockAddon::new(ctx, Behavior::FailShutdown)))
}

fn build_panicking_constructor(_ctx: AddonContext) -> AddonResult<Box<dyn Addon>> {
    panic!("constructor exploded")
}

/// The module exporting every mock addon type.
///
/// # Errors
///
/// Never fails; the signature matches [`dataconta_addons::ModuleInit`].
pub fn mock_module() -> AddonResult<AddonModule> {
    Ok(AddonModule::new()
        .export(RECORDING_ADDON, build_recording)
        .export(FAILING_INIT_ADDON, build_failing_init)
        .export(PANICKING_ADDON, build_panicking)
        .export(FAILING_SHUTDOWN_ADDON, build_failing_shutdown)
        .export(PANICKING_CONSTRUCTOR, build_panicking_constructor))
}

/// Catalog with the mock module registered under [`MOCK_MODULE`].
#[must_use]
pub fn test_catalog() -> AddonCatalog {
    AddonCatalog::new().with_module(MOCK_MODULE, mock_module)
}
