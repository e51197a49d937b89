//! DataConta CLI - terminal host for the addon system.
//!
//! Loads the layered configuration, sets up logging, scans the addons
//! directory and runs one command against the resulting addon manager.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dataconta_config::Config;
use dataconta_telemetry::{LogConfig, LogFormat, setup_logging};
use serde_json::Value;

mod commands;
mod host;
mod theme;

use commands::{OutputFormat, action_params, addons, menu, parse_param, system};
use host::Session;
use theme::{Theme, print_banner};

/// DataConta - addon host
#[derive(Parser)]
#[command(name = "dataconta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the user config
    #[arg(short, long, global = true, env = "DATACONTA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage addons
    Addons {
        #[command(subcommand)]
        command: AddonCommands,
    },

    /// Inspect and run the host menu
    Menu {
        #[command(subcommand)]
        command: MenuCommands,
    },

    /// Addon system status
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand)]
enum AddonCommands {
    /// List discovered addons
    List,
    /// Show details for one addon
    Info {
        /// Addon name
        name: String,
    },
    /// Load and initialize an addon
    Enable {
        /// Addon name
        name: String,
    },
    /// Run an addon action
    Run {
        /// Addon name
        name: String,
        /// Action name
        action: String,
        /// Action parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },
    /// Validate a bundle directory or a manifest file
    Validate {
        /// Bundle directory or manifest.json
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum MenuCommands {
    /// Show the host menu merged with addon menus
    Show,
    /// Run a menu action by id
    Run {
        /// Action id (host action or `addon_<name>_<action>`)
        action_id: String,
        /// Action parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },
}

#[derive(Subcommand)]
enum SystemCommands {
    /// Show addon system status
    Info,
}

/// Resolve configuration. A broken explicit file is fatal; otherwise fall
/// back to defaults so the CLI stays usable.
fn load_config(explicit: Option<&std::path::Path>) -> Result<(Config, Vec<String>)> {
    match Config::load(explicit) {
        Ok(resolved) => Ok((resolved.config, resolved.loaded_files)),
        Err(e) if explicit.is_some() => Err(e.into()),
        Err(e) => {
            eprintln!(
                "{}",
                Theme::warning(&format!("Invalid configuration, using defaults: {e}"))
            );
            Ok((Config::default(), Vec::new()))
        },
    }
}

fn log_config(config: &Config, verbose: bool) -> LogConfig {
    let mut lc = LogConfig::from_section(&config.logging)
        .unwrap_or_else(|_| LogConfig::new(&config.logging.level).with_format(LogFormat::Compact));
    if verbose {
        "debug".clone_into(&mut lc.level);
    }
    lc
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, loaded_files) = load_config(cli.config.as_deref())?;

    if let Err(e) = setup_logging(&log_config(&config, cli.verbose)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if cli.format == OutputFormat::Pretty {
        print_banner();
    }

    let session = Session::open(config, loaded_files, cli.format)?;

    let result = match cli.command {
        Commands::Addons { command } => handle_addons(&session, command),
        Commands::Menu { command } => handle_menu(&session, command),
        Commands::System { command } => match command {
            SystemCommands::Info => system::system_info(&session),
        },
    };

    session.manager.unload_all();
    result
}

fn handle_addons(session: &Session, command: AddonCommands) -> Result<()> {
    match command {
        AddonCommands::List => addons::list_addons(session),
        AddonCommands::Info { name } => addons::addon_info(session, &name),
        AddonCommands::Enable { name } => addons::enable_addon(session, &name),
        AddonCommands::Run {
            name,
            action,
            params,
        } => addons::run_action(session, &name, &action, &action_params(params)),
        AddonCommands::Validate { path } => addons::validate(session, &path),
    }
}

fn handle_menu(session: &Session, command: MenuCommands) -> Result<()> {
    match command {
        MenuCommands::Show => menu::show_menu(session),
        MenuCommands::Run { action_id, params } => {
            menu::run_menu_action(session, &action_id, &action_params(params))
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_params() {
        let cli = Cli::try_parse_from([
            "dataconta",
            "--format",
            "json",
            "addons",
            "run",
            "email_reports",
            "send_daily_report",
            "--param",
            "date=2026-03-14",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::Addons {
            command: AddonCommands::Run { name, params, .. },
        } = cli.command
        else {
            panic!("expected addons run");
        };
        assert_eq!(name, "email_reports");
        assert_eq!(params[0].0, "date");
    }

    #[test]
    fn test_verbose_forces_debug() {
        let config = Config::default();
        assert_eq!(log_config(&config, false).level, "info");
        assert_eq!(log_config(&config, true).level, "debug");
        assert_eq!(log_config(&config, false).format, LogFormat::Compact);
    }

    #[test]
    fn test_missing_explicit_config_is_fatal() {
        let result = load_config(Some(std::path::Path::new("/nonexistent/dataconta.toml")));
        assert!(result.is_err());
    }
}
