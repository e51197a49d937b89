//! CLI theme and styling.

use colored::Colorize;
use dataconta_addons::InfoStatus;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(60).dimmed().to_string()
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("  {:<16} {}", format!("{key}:").bold(), value)
    }

    /// Format an addon status.
    pub(crate) fn status(status: InfoStatus) -> String {
        let text = status.to_string();
        match status {
            InfoStatus::Active => text.green().to_string(),
            InfoStatus::Inactive => text.yellow().to_string(),
            InfoStatus::Error => text.red().bold().to_string(),
            InfoStatus::NotLoaded => text.dimmed().to_string(),
        }
    }
}

/// Print the one-line banner shown above human-readable output.
pub(crate) fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "{} {}",
        "DataConta".cyan().bold(),
        format!("v{version}").dimmed()
    );
}
