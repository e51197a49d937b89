//! Email reports addon.
//!
//! Builds daily and monthly sales summaries from the host's KPI service and
//! hands them to the host through `show_message`. Delivery settings come
//! from the addon's persisted configuration and can be changed at runtime
//! with the `configure_email_settings` action.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Datelike, Days, Local, NaiveDate};
use dataconta_addons::{
    ActionParams, ActionTable, Addon, AddonCatalog, AddonContext, AddonError, AddonManifest,
    AddonModule, AddonResult, ConfigMap, action_handler,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Module name referenced by the manifest entry point.
pub const MODULE_NAME: &str = "email_reports_addon";

/// Exported addon type name.
pub const TYPE_NAME: &str = "EmailReportsAddon";

/// Storage key for settings changed through the configure action.
const SETTINGS_KEY: &str = "email_reports/settings.json";

/// SMTP delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    /// SMTP host.
    pub smtp_server: String,
    /// SMTP port.
    pub smtp_port: u16,
    /// From address.
    pub sender_email: String,
    /// Report recipients.
    pub recipient_emails: Vec<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com".to_owned(),
            smtp_port: 587,
            sender_email: String::new(),
            recipient_emails: Vec::new(),
        }
    }
}

impl EmailSettings {
    /// Read settings from an addon config map. Unknown keys are ignored and
    /// malformed values fall back to defaults.
    #[must_use]
    pub fn from_config(config: &ConfigMap) -> Self {
        serde_json::from_value(Value::Object(config.clone())).unwrap_or_default()
    }

    /// Whether there is a sender and at least one recipient.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.sender_email.is_empty() && !self.recipient_emails.is_empty()
    }

    /// Apply the recognized keys of `params` on top of these settings.
    ///
    /// `recipient_emails` accepts an array or a comma-separated string.
    fn apply(&mut self, params: &ActionParams) -> AddonResult<()> {
        if let Some(server) = params.get("smtp_server").and_then(Value::as_str) {
            server.clone_into(&mut self.smtp_server);
        }
        if let Some(port) = params.get("smtp_port") {
            let parsed = match port {
                Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
                Value::String(s) => s.parse().ok(),
                _ => None,
            };
            self.smtp_port = parsed
                .ok_or_else(|| AddonError::ActionFailed(format!("invalid smtp_port: {port}")))?;
        }
        if let Some(sender) = params.get("sender_email").and_then(Value::as_str) {
            sender.clone_into(&mut self.sender_email);
        }
        match params.get("recipient_emails") {
            Some(Value::Array(items)) => {
                self.recipient_emails = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect();
            },
            Some(Value::String(list)) => {
                self.recipient_emails = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect();
            },
            _ => {},
        }
        Ok(())
    }
}

/// A rendered report ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Email subject.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Recipients at the time the report was built.
    pub recipients: Vec<String>,
}

/// Sales figures pulled from a KPI payload.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SalesFigures {
    total_sales: f64,
    invoices: u64,
    daily_average: f64,
}

impl SalesFigures {
    fn from_kpis(kpis: &Value) -> Self {
        let number = |key: &str| kpis.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        Self {
            total_sales: number("total_ventas"),
            invoices: kpis
                .get("total_facturas")
                .or_else(|| kpis.get("numero_facturas"))
                .and_then(Value::as_u64)
                .unwrap_or(0),
            daily_average: number("promedio_diario"),
        }
    }
}

/// Sends financial reports by email.
pub struct EmailReportsAddon {
    ctx: AddonContext,
    settings: Arc<Mutex<EmailSettings>>,
}

impl EmailReportsAddon {
    /// Build the addon from its context, reading settings from the persisted
    /// addon config.
    #[must_use]
    pub fn new(ctx: AddonContext) -> Self {
        let settings = EmailSettings::from_config(ctx.addon_config());
        Self {
            ctx,
            settings: Arc::new(Mutex::new(settings)),
        }
    }

    /// Current delivery settings.
    #[must_use]
    pub fn settings(&self) -> EmailSettings {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn restore_stored_settings(&self) -> AddonResult<()> {
        let Some(storage) = self.ctx.file_storage() else {
            return Ok(());
        };
        let Some(bytes) = storage.read(SETTINGS_KEY)? else {
            return Ok(());
        };
        let stored: EmailSettings = serde_json::from_slice(&bytes)?;
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = stored;
        debug!(addon = %self.ctx.manifest().name, "restored stored email settings");
        Ok(())
    }
}

/// Parse an optional `date` param (`YYYY-MM-DD`).
fn date_param(params: &ActionParams) -> AddonResult<Option<NaiveDate>> {
    match params.get("date").and_then(Value::as_str) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| AddonError::ActionFailed(format!("invalid date '{raw}': {e}"))),
    }
}

fn fetch_figures(ctx: &AddonContext, year: i32) -> AddonResult<Option<SalesFigures>> {
    match ctx.kpi_service() {
        Some(service) => Ok(Some(SalesFigures::from_kpis(&service.kpis(Some(year))?))),
        None => Ok(None),
    }
}

fn ready_settings(settings: &Mutex<EmailSettings>) -> AddonResult<EmailSettings> {
    let current = settings
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if current.is_complete() {
        Ok(current)
    } else {
        Err(AddonError::ActionFailed(
            "email settings incomplete: sender and recipients are required".to_owned(),
        ))
    }
}

fn render_daily(day: NaiveDate, figures: Option<SalesFigures>) -> String {
    let mut body = format!("Reporte diario DataConta\nFecha: {}\n\n", day.format("%Y-%m-%d"));
    match figures {
        Some(f) => {
            let _ = writeln!(body, "Total ventas: ${:.2}", f.total_sales);
            let _ = writeln!(body, "Número de facturas: {}", f.invoices);
        },
        None => body.push_str("Indicadores no disponibles\n"),
    }
    body
}

fn render_monthly(day: NaiveDate, figures: Option<SalesFigures>) -> String {
    let mut body = format!("Reporte mensual DataConta\nPeríodo: {}\n\n", day.format("%m/%Y"));
    match figures {
        Some(f) => {
            let _ = writeln!(body, "Total ventas del mes: ${:.2}", f.total_sales);
            let _ = writeln!(body, "Total facturas: {}", f.invoices);
            let _ = writeln!(body, "Promedio diario: ${:.2}", f.daily_average);
        },
        None => body.push_str("Indicadores no disponibles\n"),
    }
    body
}

fn deliver(ctx: &AddonContext, report: &Report) -> AddonResult<Value> {
    info!(
        addon = %ctx.manifest().name,
        subject = %report.subject,
        recipients = report.recipients.len(),
        "report ready for delivery"
    );
    ctx.show_message(&report.subject, &report.body);
    Ok(serde_json::to_value(report)?)
}

impl Addon for EmailReportsAddon {
    fn manifest(&self) -> &AddonManifest {
        self.ctx.manifest()
    }

    fn initialize(&mut self) -> AddonResult<()> {
        self.restore_stored_settings()?;
        self.ctx.logger().info("email reports ready");
        Ok(())
    }

    fn shutdown(&mut self) -> AddonResult<()> {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) =
            EmailSettings::from_config(self.ctx.addon_config());
        self.ctx.logger().info("email reports stopped");
        Ok(())
    }

    fn actions(&self) -> ActionTable {
        let mut table = ActionTable::new();

        let (ctx, settings) = (self.ctx.clone(), Arc::clone(&self.settings));
        table.insert(
            "send_daily_report".to_owned(),
            action_handler(move |params| {
                let current = ready_settings(&settings)?;
                let day = match date_param(params)? {
                    Some(day) => day,
                    None => Local::now()
                        .date_naive()
                        .checked_sub_days(Days::new(1))
                        .ok_or_else(|| AddonError::ActionFailed("date out of range".into()))?,
                };
                let report = Report {
                    subject: format!("Reporte Diario DataConta - {}", day.format("%Y-%m-%d")),
                    body: render_daily(day, fetch_figures(&ctx, day.year())?),
                    recipients: current.recipient_emails,
                };
                deliver(&ctx, &report)
            }),
        );

        let (ctx, settings) = (self.ctx.clone(), Arc::clone(&self.settings));
        table.insert(
            "send_monthly_report".to_owned(),
            action_handler(move |params| {
                let current = ready_settings(&settings)?;
                let day = date_param(params)?.unwrap_or_else(|| Local::now().date_naive());
                let report = Report {
                    subject: format!("Reporte Mensual DataConta - {}", day.format("%m/%Y")),
                    body: render_monthly(day, fetch_figures(&ctx, day.year())?),
                    recipients: current.recipient_emails,
                };
                deliver(&ctx, &report)
            }),
        );

        let (ctx, settings) = (self.ctx.clone(), Arc::clone(&self.settings));
        table.insert(
            "configure_email_settings".to_owned(),
            action_handler(move |params| {
                let updated = {
                    let mut guard = settings.lock().unwrap_or_else(PoisonError::into_inner);
                    let mut next = guard.clone();
                    next.apply(params)?;
                    *guard = next.clone();
                    next
                };
                if let Some(storage) = ctx.file_storage() {
                    storage.write(SETTINGS_KEY, &serde_json::to_vec_pretty(&updated)?)?;
                }
                ctx.show_message(
                    "Configuración de email",
                    &format!(
                        "Servidor: {}:{}\nRemitente: {}\nDestinatarios: {}",
                        updated.smtp_server,
                        updated.smtp_port,
                        updated.sender_email,
                        updated.recipient_emails.join(", ")
                    ),
                );
                Ok(serde_json::to_value(&updated)?)
            }),
        );

        table
    }

    fn config_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "smtp_server": {"type": "string"},
                "smtp_port": {"type": "integer", "minimum": 1, "maximum": 65535},
                "sender_email": {"type": "string"},
                "recipient_emails": {"type": "array", "items": {"type": "string"}}
            }
        }))
    }

    fn handle_config_change(&mut self, config: &ConfigMap) -> AddonResult<()> {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) =
            EmailSettings::from_config(config);
        Ok(())
    }
}

fn build(ctx: AddonContext) -> AddonResult<Box<dyn Addon>> {
    Ok(Box::new(EmailReportsAddon::new(ctx)))
}

/// The compiled module behind the bundle's entry point.
///
/// # Errors
///
/// Never fails; the signature matches [`dataconta_addons::ModuleInit`].
pub fn module() -> AddonResult<AddonModule> {
    Ok(AddonModule::new().export(TYPE_NAME, build))
}

/// Register this addon's module in a host catalog.
pub fn register(catalog: &mut AddonCatalog) {
    catalog.register(MODULE_NAME, module);
}
