//! CLI commands.

pub(crate) mod addons;
pub(crate) mod menu;
pub(crate) mod system;

use clap::ValueEnum;
use dataconta_addons::ActionParams;
use serde::Serialize;
use serde_json::Value;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Colored, human-readable text.
    #[default]
    Pretty,
    /// Pretty-printed JSON on stdout.
    Json,
}

/// Print `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse a `key=value` argument. Values that parse as JSON keep their type,
/// anything else is a string.
pub(crate) fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}

/// Collect parsed `--param` pairs into action params. Later pairs win.
pub(crate) fn action_params(pairs: Vec<(String, Value)>) -> ActionParams {
    pairs.into_iter().collect()
}
