//! Host version compatibility.

use semver::Version;

use crate::error::{AddonError, AddonResult};
use crate::manifest::AddonManifest;

/// Parse a version string, padding `"1"` and `"1.2"` to three components.
///
/// Returns `None` for anything semver rejects after padding.
#[must_use]
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let core_len = trimmed
        .find(['-', '+'])
        .unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(core_len);
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => trimmed.to_owned(),
    };
    Version::parse(&padded).ok()
}

/// Check `manifest`'s host bounds against `host_version`.
///
/// # Errors
///
/// Returns [`AddonError::Incompatible`] naming the failed bound, or the
/// malformed version string.
pub fn check_compatibility(manifest: &AddonManifest, host_version: &str) -> AddonResult<()> {
    let incompatible = |reason: String| AddonError::Incompatible {
        name: manifest.name.clone(),
        host_version: host_version.to_owned(),
        reason,
    };

    let current = parse_version(host_version)
        .ok_or_else(|| incompatible(format!("malformed host version '{host_version}'")))?;
    let min = parse_version(&manifest.min_host_version).ok_or_else(|| {
        incompatible(format!(
            "malformed minimum version '{}'",
            manifest.min_host_version
        ))
    })?;
    if current < min {
        return Err(incompatible(format!("requires at least {min}")));
    }

    if let Some(raw_max) = &manifest.max_host_version {
        let max = parse_version(raw_max)
            .ok_or_else(|| incompatible(format!("malformed maximum version '{raw_max}'")))?;
        if current > max {
            return Err(incompatible(format!("supports at most {max}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn manifest(min: &str, max: Option<&str>) -> AddonManifest {
        let mut raw = json!({
            "name": "bounds",
            "entry_point": "b.B",
            "min_dataconta_version": min
        });
        if let Some(max) = max {
            raw["max_dataconta_version"] = json!(max);
        }
        AddonManifest::from_value(raw).unwrap()
    }

    #[test]
    fn test_parse_version_padding() {
        assert_eq!(parse_version("1"), Some(Version::new(1, 0, 0)));
        assert_eq!(parse_version("1.5"), Some(Version::new(1, 5, 0)));
        assert_eq!(parse_version(" 2.3.4 "), Some(Version::new(2, 3, 4)));
        assert!(parse_version("1.0-beta").is_some());
        assert!(parse_version("").is_none());
        assert!(parse_version("one.two").is_none());
        assert!(parse_version("1.2.3.4").is_none());
    }

    #[test]
    fn test_below_min_is_incompatible() {
        let err = check_compatibility(&manifest("2.0.0", None), "1.5.0").unwrap_err();
        assert!(matches!(err, AddonError::Incompatible { .. }));
    }

    #[test]
    fn test_boundaries() {
        assert!(check_compatibility(&manifest("1.5.0", None), "1.5.0").is_ok());
        assert!(check_compatibility(&manifest("1.0.0", Some("1.5.0")), "1.5.0").is_ok());
        assert!(check_compatibility(&manifest("1.0.0", Some("1.4.9")), "1.5.0").is_err());
        assert!(check_compatibility(&manifest("1.0.0", None), "99.0.0").is_ok());
    }

    #[test]
    fn test_malformed_versions_are_incompatible() {
        assert!(check_compatibility(&manifest("abc", None), "1.5.0").is_err());
        assert!(check_compatibility(&manifest("1.0.0", Some("x.y")), "1.5.0").is_err());
        assert!(check_compatibility(&manifest("1.0.0", None), "not-a-version").is_err());
    }
}
