//! Addon bundle discovery and per-addon configuration storage.
//!
//! The manager only talks to the [`AddonRepository`] trait, so the on-disk
//! layout lives here and nowhere else:
//!
//! ```text
//! <addons_path>/
//!   email_reports/
//!     manifest.json
//!     email_reports_addon.rs
//!   config/
//!     email_reports.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::AddonSystemConfig;
use crate::context::ConfigMap;
use crate::error::{AddonError, AddonResult};
use crate::manifest::{AddonManifest, MANIFEST_FILE_NAME};

/// Storage-side operations the manager needs.
///
/// Every method is total: failures are logged and turned into an empty or
/// negative result.
pub trait AddonRepository: Send + Sync {
    /// Bundle directories found under the root, sorted by path.
    fn find_all_addons(&self) -> Vec<PathBuf>;

    /// Parse the manifest of the bundle at `location`.
    fn load_addon_manifest(&self, location: &Path) -> Option<AddonManifest>;

    /// Structural check of a bundle. Never runs addon code.
    fn validate_addon(&self, location: &Path) -> bool;

    /// Persisted configuration for `name`. Empty if none was saved.
    fn get_addon_config(&self, name: &str) -> ConfigMap;

    /// Persist configuration for `name`.
    fn save_addon_config(&self, name: &str, config: &ConfigMap) -> bool;
}

/// Read and parse a manifest file.
///
/// # Errors
///
/// Returns [`AddonError::ManifestParseError`] if the file cannot be read or
/// does not describe a valid manifest.
pub fn load_manifest(path: &Path) -> AddonResult<AddonManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| AddonError::ManifestParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    AddonManifest::from_json_str(&content).map_err(|e| AddonError::ManifestParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Reject names that would escape the config directory.
fn is_safe_config_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.contains("..")
        && !name.starts_with('.')
}

/// Repository backed by a directory tree.
#[derive(Debug, Clone)]
pub struct FileSystemRepository {
    root: PathBuf,
    config_dir: PathBuf,
    module_extension: String,
    config: AddonSystemConfig,
}

impl FileSystemRepository {
    /// Open the repository, creating the root and config directories if
    /// they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn new(config: &AddonSystemConfig) -> AddonResult<Self> {
        let root = config.addons_path.clone();
        let config_dir = config.config_dir();
        std::fs::create_dir_all(&root)?;
        std::fs::create_dir_all(&config_dir)?;
        debug!(root = %root.display(), "Opened addon repository");
        Ok(Self {
            root,
            config_dir,
            module_extension: config.module_extension.clone(),
            config: config.clone(),
        })
    }

    /// Root directory of the repository.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the persisted config file for `name`.
    #[must_use]
    pub fn config_path(&self, name: &str) -> PathBuf {
        self.config_dir.join(format!("{name}.json"))
    }

    /// Path of the source unit for `module` inside `location`.
    #[must_use]
    pub fn module_path(&self, location: &Path, module: &str) -> PathBuf {
        location.join(format!("{module}.{}", self.module_extension))
    }

    fn write_config(&self, name: &str, config: &ConfigMap) -> AddonResult<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let body = serde_json::to_string_pretty(config)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.config_dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.config_path(name))
            .map_err(|e| AddonError::Config {
                name: name.to_owned(),
                message: format!("failed to replace config file: {e}"),
            })?;
        Ok(())
    }

    fn read_config(&self, name: &str) -> AddonResult<ConfigMap> {
        let path = self.config_path(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigMap::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<serde_json::Value>(&content)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(AddonError::Config {
                name: name.to_owned(),
                message: "config file is not a JSON object".to_owned(),
            }),
        }
    }
}

impl AddonRepository for FileSystemRepository {
    fn find_all_addons(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.root.display(), error = %e, "Failed to read addons directory");
                return Vec::new();
            },
        };

        let mut found: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !self.config.is_skipped(n))
            })
            .filter(|path| path.join(MANIFEST_FILE_NAME).is_file())
            .collect();
        found.sort();

        debug!(root = %self.root.display(), count = found.len(), "Found addon bundles");
        found
    }

    fn load_addon_manifest(&self, location: &Path) -> Option<AddonManifest> {
        let manifest_path = location.join(MANIFEST_FILE_NAME);
        match load_manifest(&manifest_path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "Failed to load addon manifest");
                None
            },
        }
    }

    fn validate_addon(&self, location: &Path) -> bool {
        if !location.is_dir() {
            debug!(path = %location.display(), "Not a directory");
            return false;
        }
        if !location.join(MANIFEST_FILE_NAME).is_file() {
            debug!(path = %location.display(), "Missing manifest");
            return false;
        }
        let Some(manifest) = self.load_addon_manifest(location) else {
            return false;
        };
        let Some((module, _)) = manifest.entry_point_parts() else {
            warn!(
                path = %location.display(),
                entry_point = %manifest.entry_point,
                "Entry point must be module.TypeName"
            );
            return false;
        };
        let module_path = self.module_path(location, module);
        if !module_path.is_file() {
            warn!(path = %module_path.display(), "Entry point module file not found");
            return false;
        }
        true
    }

    fn get_addon_config(&self, name: &str) -> ConfigMap {
        if !is_safe_config_name(name) {
            warn!(addon = %name, "Refusing config lookup for unsafe addon name");
            return ConfigMap::new();
        }
        match self.read_config(name) {
            Ok(config) => config,
            Err(e) => {
                warn!(addon = %name, error = %e, "Failed to read addon config");
                ConfigMap::new()
            },
        }
    }

    fn save_addon_config(&self, name: &str, config: &ConfigMap) -> bool {
        if !is_safe_config_name(name) {
            warn!(addon = %name, "Refusing to save config for unsafe addon name");
            return false;
        }
        match self.write_config(name, config) {
            Ok(()) => {
                info!(addon = %name, "Saved addon config");
                true
            },
            Err(e) => {
                warn!(addon = %name, error = %e, "Failed to save addon config");
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn repo(dir: &TempDir) -> FileSystemRepository {
        FileSystemRepository::new(&AddonSystemConfig::new(dir.path())).unwrap()
    }

    fn write_bundle(root: &Path, dir: &str, manifest: &serde_json::Value, module: Option<&str>) {
        let bundle = root.join(dir);
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(
            bundle.join(MANIFEST_FILE_NAME),
            serde_json::to_string(manifest).unwrap(),
        )
        .unwrap();
        if let Some(module) = module {
            std::fs::write(bundle.join(format!("{module}.rs")), "// addon").unwrap();
        }
    }

    fn manifest(name: &str, entry_point: &str) -> serde_json::Value {
        json!({"name": name, "version": "1.0.0", "entry_point": entry_point})
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    #[test]
    fn test_new_creates_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested/addons");
        let cfg = AddonSystemConfig::new(&root);
        let repo = FileSystemRepository::new(&cfg).unwrap();
        assert!(repo.root().is_dir());
        assert!(root.join("config").is_dir());
    }

    #[test]
    fn test_find_all_addons_skips_reserved_and_manifestless_dirs() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        write_bundle(dir.path(), "beta", &manifest("beta", "b.B"), Some("b"));
        write_bundle(dir.path(), "alpha", &manifest("alpha", "a.A"), Some("a"));
        write_bundle(dir.path(), ".git", &manifest("git", "g.G"), Some("g"));
        write_bundle(dir.path(), "__pycache__", &manifest("cache", "c.C"), None);
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::write(dir.path().join("config/alpha.json"), "{}").unwrap();
        std::fs::write(dir.path().join("config").join(MANIFEST_FILE_NAME), "{}").unwrap();
        std::fs::write(dir.path().join("stray.txt"), "x").unwrap();

        let found = repo.find_all_addons();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_find_all_addons_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        std::fs::remove_dir_all(dir.path()).unwrap();
        assert!(repo.find_all_addons().is_empty());
    }

    #[test]
    fn test_load_addon_manifest_malformed_is_none() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        let bundle = dir.path().join("broken");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join(MANIFEST_FILE_NAME), "{ not json").unwrap();
        assert!(repo.load_addon_manifest(&bundle).is_none());

        std::fs::write(bundle.join(MANIFEST_FILE_NAME), r#"{"version": "1.0.0"}"#).unwrap();
        assert!(repo.load_addon_manifest(&bundle).is_none());
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn test_validate_addon_accepts_complete_bundle() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        write_bundle(dir.path(), "good", &manifest("good", "good_addon.Good"), Some("good_addon"));
        assert!(repo.validate_addon(&dir.path().join("good")));
    }

    #[test]
    fn test_validate_addon_rejects_non_directory() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        let file = dir.path().join("file.json");
        std::fs::write(&file, "{}").unwrap();
        assert!(!repo.validate_addon(&file));
        assert!(!repo.validate_addon(&dir.path().join("missing")));
    }

    #[test]
    fn test_validate_addon_rejects_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        let bundle = dir.path().join("no_manifest");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join("m.rs"), "").unwrap();
        assert!(!repo.validate_addon(&bundle));
    }

    #[test]
    fn test_validate_addon_rejects_bad_entry_point() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        write_bundle(dir.path(), "one", &manifest("one", "justmodule"), Some("justmodule"));
        write_bundle(dir.path(), "three", &manifest("three", "a.b.C"), Some("a"));
        assert!(!repo.validate_addon(&dir.path().join("one")));
        assert!(!repo.validate_addon(&dir.path().join("three")));
    }

    #[test]
    fn test_validate_addon_rejects_missing_source_unit() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        write_bundle(dir.path(), "nosrc", &manifest("nosrc", "nosrc_addon.NoSrc"), None);
        assert!(!repo.validate_addon(&dir.path().join("nosrc")));
    }

    // -----------------------------------------------------------------------
    // Config
    // -----------------------------------------------------------------------

    #[test]
    fn test_missing_config_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(repo(&dir).get_addon_config("nobody").is_empty());
    }

    #[test]
    fn test_config_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        let mut config = ConfigMap::new();
        config.insert("smtp_port".into(), json!(587));
        config.insert("recipients".into(), json!(["ops@example.com"]));

        assert!(repo.save_addon_config("mailer", &config));
        assert_eq!(repo.get_addon_config("mailer"), config);

        let on_disk = std::fs::read_to_string(dir.path().join("config/mailer.json")).unwrap();
        assert!(on_disk.contains("\n  \"smtp_port\": 587"));
    }

    #[test]
    fn test_config_overwrite() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        let mut first = ConfigMap::new();
        first.insert("a".into(), json!(1));
        let mut second = ConfigMap::new();
        second.insert("b".into(), json!(2));
        assert!(repo.save_addon_config("x_addon", &first));
        assert!(repo.save_addon_config("x_addon", &second));
        assert_eq!(repo.get_addon_config("x_addon"), second);
    }

    #[test]
    fn test_non_object_config_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        std::fs::write(dir.path().join("config/listy.json"), "[1, 2]").unwrap();
        assert!(repo.get_addon_config("listy").is_empty());
    }

    #[test]
    fn test_unsafe_config_names_are_refused() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        let config = ConfigMap::new();
        assert!(!repo.save_addon_config("../escape", &config));
        assert!(!repo.save_addon_config("a/b", &config));
        assert!(!repo.save_addon_config("", &config));
        assert!(repo.get_addon_config("../escape").is_empty());
    }
}
