//! `DATACONTA_*` environment overrides.
//!
//! Environment variables form the last layer: a set variable replaces
//! whatever the files said.

use std::collections::HashMap;

use tracing::debug;

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_PREFIX: &str = "DATACONTA_";

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "DATACONTA_ADDONS_PATH",
        field_path: "addons.path",
    },
    EnvMapping {
        var_name: "DATACONTA_HOST_VERSION",
        field_path: "addons.host_version",
    },
    EnvMapping {
        var_name: "DATACONTA_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "DATACONTA_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "DATACONTA_MENU_FILE",
        field_path: "menu.config_file",
    },
];

/// Snapshot the `DATACONTA_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect()
}

/// Write every set and non-empty mapped variable into `merged`.
///
/// Returns the number of overrides applied.
pub fn apply_env_overrides<S: std::hash::BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;
    for mapping in ENV_MAPPINGS {
        let Some(value) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if value.trim().is_empty() {
            continue;
        }
        if set_path(merged, mapping.field_path, toml::Value::String(value.clone())) {
            debug!(var = mapping.var_name, field = mapping.field_path, "applied env override");
            count = count.saturating_add(1);
        }
    }
    count
}

/// Set a dotted `path` in a table tree, creating intermediate tables.
fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) -> bool {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return false;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return true;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> toml::Value {
        toml::from_str(
            r#"
            [addons]
            path = "addons"
            host_version = "3.0.0"
        "#,
        )
        .unwrap()
    }

    #[test]
    fn test_override_replaces_file_value() {
        let mut merged = base();
        let env = HashMap::from([(
            "DATACONTA_HOST_VERSION".to_owned(),
            "3.2.0".to_owned(),
        )]);
        assert_eq!(apply_env_overrides(&mut merged, &env), 1);
        assert_eq!(merged["addons"]["host_version"].as_str(), Some("3.2.0"));
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let mut merged = base();
        let env = HashMap::from([("DATACONTA_ADDONS_PATH".to_owned(), "  ".to_owned())]);
        assert_eq!(apply_env_overrides(&mut merged, &env), 0);
        assert_eq!(merged["addons"]["path"].as_str(), Some("addons"));
    }

    #[test]
    fn test_missing_section_is_created() {
        let mut merged = base();
        let env = HashMap::from([("DATACONTA_LOG_LEVEL".to_owned(), "debug".to_owned())]);
        assert_eq!(apply_env_overrides(&mut merged, &env), 1);
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
    }

    #[test]
    fn test_unmapped_variables_are_ignored() {
        let mut merged = base();
        let env = HashMap::from([("DATACONTA_UNKNOWN".to_owned(), "x".to_owned())]);
        assert_eq!(apply_env_overrides(&mut merged, &env), 0);
    }
}
