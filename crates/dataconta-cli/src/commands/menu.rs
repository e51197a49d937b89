//! Menu commands - show the combined menu and run menu actions.

use anyhow::bail;
use colored::Colorize;
use dataconta_addons::{ActionParams, ActionRoute, MenuActionKind};

use crate::commands::{OutputFormat, print_json};
use crate::host::Session;
use crate::theme::Theme;

pub(crate) fn show_menu(session: &Session) -> anyhow::Result<()> {
    session.enable_compatible();
    let integration = session.menu()?;
    let categories = integration.get_combined_categories();
    let addon_categories = integration.addon_categories();

    if session.format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "horizontal_menu": categories,
            "stats": integration.get_addon_menu_stats(),
        }));
    }

    for (id, category) in &categories {
        let title = format!("{} {}", category.icon, category.label);
        let marker = if addon_categories.contains_key(id) {
            Theme::dimmed(" (addon)")
        } else {
            String::new()
        };
        println!("{}{marker}", Theme::header(&title));
        for item in &category.submenu {
            let label = if item.enabled {
                item.label.normal()
            } else {
                item.label.dimmed()
            };
            println!("  {} {:<28} {}", item.icon, label, Theme::dimmed(&item.action));
        }
    }

    let stats = integration.get_addon_menu_stats();
    println!(
        "\n{}",
        Theme::dimmed(&format!(
            "{} addon categories, {} addon actions",
            stats.addon_categories, stats.addon_actions
        ))
    );
    Ok(())
}

pub(crate) fn run_menu_action(
    session: &Session,
    action_id: &str,
    params: &ActionParams,
) -> anyhow::Result<()> {
    session.enable_compatible();
    let integration = session.menu()?;

    match integration.route_action(action_id, params) {
        ActionRoute::Addon { executed: true } => {
            if session.format == OutputFormat::Json {
                return print_json(&serde_json::json!({"action": action_id, "executed": true}));
            }
            println!("{}", Theme::success(&format!("{action_id} completed")));
            Ok(())
        },
        ActionRoute::Addon { executed: false } => bail!("addon action {action_id} failed"),
        ActionRoute::Host(action) => {
            if session.format == OutputFormat::Json {
                return print_json(&serde_json::json!({
                    "action": action_id,
                    "host": action,
                }));
            }
            let kind = match action.kind {
                MenuActionKind::Dialog => "dialog",
                MenuActionKind::System => "system",
                MenuActionKind::Addon => "addon",
                MenuActionKind::Other => "other",
            };
            println!(
                "{}",
                Theme::info(&format!("{action_id} is a host {kind} action"))
            );
            for text in [&action.title, &action.description, &action.content] {
                if !text.is_empty() {
                    println!("  {text}");
                }
            }
            Ok(())
        },
        ActionRoute::Unknown => bail!("unknown menu action: {action_id}"),
    }
}
