//! Addon commands - list, inspect, enable, run and validate addons.

use std::path::Path;

use anyhow::{Context as _, bail};
use colored::Colorize;
use dataconta_addons::{ActionParams, AddonInfo, ValidationReport, validate_bundle, validate_value};
use serde::Serialize;

use crate::commands::{OutputFormat, print_json};
use crate::host::Session;
use crate::theme::Theme;

/// One row of `addons list`.
#[derive(Serialize)]
struct ListedAddon {
    #[serde(flatten)]
    info: AddonInfo,
    compatible: bool,
}

pub(crate) fn list_addons(session: &Session) -> anyhow::Result<()> {
    let manager = &session.manager;
    let rows: Vec<ListedAddon> = manager
        .discovered_addons()
        .into_iter()
        .filter_map(|manifest| {
            let compatible = manager.is_compatible(&manifest);
            manager
                .get_addon_info(&manifest.name)
                .map(|info| ListedAddon { info, compatible })
        })
        .collect();

    if session.format == OutputFormat::Json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!(
            "{}",
            Theme::info(&format!(
                "No addons found in {}",
                manager.addons_path().display()
            ))
        );
        return Ok(());
    }

    println!("{}", Theme::header("Addons"));
    println!(
        "  {:<24} {:<10} {:<14} {:<12} {}",
        "NAME".dimmed(),
        "VERSION".dimmed(),
        "TYPE".dimmed(),
        "STATUS".dimmed(),
        "DESCRIPTION".dimmed()
    );
    println!("{}", Theme::separator());
    for row in &rows {
        let name = if row.compatible {
            row.info.name.clone()
        } else {
            format!("{} {}", row.info.name, "(incompatible)".red())
        };
        println!(
            "  {:<24} {:<10} {:<14} {:<12} {}",
            name,
            row.info.version,
            row.info.addon_type.as_str(),
            Theme::status(row.info.status),
            Theme::dimmed(&row.info.description)
        );
    }
    println!("\n{}", Theme::dimmed(&format!("{} addon(s)", rows.len())));
    Ok(())
}

pub(crate) fn addon_info(session: &Session, name: &str) -> anyhow::Result<()> {
    let manager = &session.manager;
    let Some(info) = manager.get_addon_info(name) else {
        bail!("addon not found: {name}");
    };
    let manifest = manager
        .discovered_addons()
        .into_iter()
        .find(|m| m.name == name);

    if session.format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "info": info,
            "manifest": manifest,
            "config": manager.addon_config(name),
        }));
    }

    println!("{}", Theme::header(&format!("{} v{}", info.name, info.version)));
    println!("{}", Theme::kv("Description", &info.description));
    println!("{}", Theme::kv("Author", &info.author));
    println!("{}", Theme::kv("Type", info.addon_type.as_str()));
    println!("{}", Theme::kv("Status", &Theme::status(info.status)));
    if let Some(manifest) = &manifest {
        println!("{}", Theme::kv("Entry point", &manifest.entry_point));
        let bounds = manifest.max_host_version.as_ref().map_or_else(
            || format!(">= {}", manifest.min_host_version),
            |max| format!("{} - {max}", manifest.min_host_version),
        );
        println!("{}", Theme::kv("Host versions", &bounds));
        println!("{}", Theme::kv("License tier", &manifest.required_license_tier));
        if !manifest.permissions.is_empty() {
            let permissions: Vec<&str> = manifest.permissions.iter().map(String::as_str).collect();
            println!("{}", Theme::kv("Permissions", &permissions.join(", ")));
        }
        if !manifest.menu_items.is_empty() {
            println!("\n{}", Theme::header("Menu items"));
            for item in &manifest.menu_items {
                println!(
                    "  {} {:<24} {}",
                    item.icon.as_deref().unwrap_or("•"),
                    item.label,
                    Theme::dimmed(&item.action)
                );
            }
        }
    }
    if let Some(error) = &info.last_error {
        println!("\n{}", Theme::error(error));
    }
    Ok(())
}

pub(crate) fn enable_addon(session: &Session, name: &str) -> anyhow::Result<()> {
    let manager = &session.manager;
    manager
        .try_load(name)
        .with_context(|| format!("could not load addon {name}"))?;
    if !manager.enable(name) {
        let reason = manager
            .get_addon_info(name)
            .and_then(|info| info.last_error)
            .unwrap_or_else(|| "initialization failed".to_owned());
        bail!("could not enable addon {name}: {reason}");
    }

    if session.format == OutputFormat::Json {
        return print_json(&manager.get_addon_info(name));
    }
    println!("{}", Theme::success(&format!("Enabled {name}")));
    Ok(())
}

pub(crate) fn run_action(
    session: &Session,
    name: &str,
    action: &str,
    params: &ActionParams,
) -> anyhow::Result<()> {
    let manager = &session.manager;
    manager
        .try_load(name)
        .with_context(|| format!("could not load addon {name}"))?;
    if !manager.enable(name) {
        bail!("could not enable addon {name}");
    }

    let Some(result) = manager.execute_action(name, action, params) else {
        let reason = manager
            .get_addon_info(name)
            .and_then(|info| info.last_error)
            .unwrap_or_else(|| format!("no action '{action}'"));
        bail!("action {name}.{action} failed: {reason}");
    };

    if session.format == OutputFormat::Json {
        return print_json(&result);
    }
    println!("{}", Theme::success(&format!("{name}.{action} completed")));
    if !result.is_null() {
        println!("{}", Theme::dimmed(&serde_json::to_string_pretty(&result)?));
    }
    Ok(())
}

fn validate_path(path: &Path, module_extension: &str) -> anyhow::Result<ValidationReport> {
    if path.is_dir() {
        return Ok(validate_bundle(path, module_extension));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(validate_value(&raw))
}

pub(crate) fn validate(session: &Session, path: &Path) -> anyhow::Result<()> {
    let report = validate_path(path, &session.config.addons.module_extension)?;

    if session.format == OutputFormat::Json {
        print_json(&report)?;
    } else {
        println!("{}", Theme::header(&format!("Validating {}", path.display())));
        for error in &report.errors {
            println!("  {}", Theme::error(error));
        }
        for warning in &report.warnings {
            println!("  {}", Theme::warning(warning));
        }
        if report.is_valid() {
            println!("{}", Theme::success("Manifest is valid"));
        }
    }

    if !report.is_valid() {
        bail!("{} validation error(s)", report.errors.len());
    }
    Ok(())
}
