//! System command - addon system overview.

use crate::commands::{OutputFormat, print_json};
use crate::host::Session;
use crate::theme::Theme;

pub(crate) fn system_info(session: &Session) -> anyhow::Result<()> {
    let info = session.manager.system_info();

    if session.format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "system": info,
            "config_files": session.loaded_files,
            "menu_file": session.menu_path(),
        }));
    }

    println!("{}", Theme::header("DataConta addon system"));
    println!("{}", Theme::kv("Host version", &info.host_version));
    println!("{}", Theme::kv("Addons path", &info.addons_path.display().to_string()));
    println!("{}", Theme::kv("Menu file", &session.menu_path().display().to_string()));
    println!("{}", Theme::kv("Discovered", &info.discovered.to_string()));
    println!("{}", Theme::kv("Loaded", &info.loaded.to_string()));
    println!("{}", Theme::kv("Active", &info.active.to_string()));
    if session.loaded_files.is_empty() {
        println!("{}", Theme::kv("Config files", &Theme::dimmed("defaults only")));
    } else {
        println!("{}", Theme::kv("Config files", &session.loaded_files.join(", ")));
    }
    Ok(())
}
