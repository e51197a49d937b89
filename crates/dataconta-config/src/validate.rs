//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_addons(config)?;
    validate_logging(config)?;
    validate_menu(config)?;
    Ok(())
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message,
    }
}

/// Accepts `"3"`, `"3.1"` and full semver strings.
fn is_host_version(raw: &str) -> bool {
    let core_len = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(core_len);
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => raw.to_owned(),
    };
    semver::Version::parse(&padded).is_ok()
}

fn validate_addons(config: &Config) -> ConfigResult<()> {
    let a = &config.addons;

    if a.path.as_os_str().is_empty() {
        return Err(invalid("addons.path", "addons path must not be empty".to_owned()));
    }

    if !is_host_version(a.host_version.trim()) {
        return Err(invalid(
            "addons.host_version",
            format!("'{}' is not a semantic version", a.host_version),
        ));
    }

    let ext = &a.module_extension;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid(
            "addons.module_extension",
            format!("'{ext}' must be a non-empty alphanumeric extension without a dot"),
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}

fn validate_menu(config: &Config) -> ConfigResult<()> {
    if config.menu.config_file.as_os_str().is_empty() {
        return Err(invalid(
            "menu.config_file",
            "menu config file must not be empty".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_host_version_forms() {
        let mut config = Config::default();
        for ok in ["3", "3.1", "3.1.4", "3.1.4-beta"] {
            config.addons.host_version = ok.to_owned();
            assert!(validate(&config).is_ok(), "{ok} should be accepted");
        }
        config.addons.host_version = "three".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("addons.host_version"));
    }

    #[test]
    fn test_module_extension_rules() {
        let mut config = Config::default();
        config.addons.module_extension = ".rs".to_owned();
        assert!(validate(&config).is_err());
        config.addons.module_extension = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_logging_rules() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
        config.logging.format = "json".to_owned();
        config.logging.level = "verbose".to_owned();
        assert!(validate(&config).is_err());
    }
}
