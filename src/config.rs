//! Instance registry and its on-disk document.
//!
//! The registry is a TOML file, `instances.toml`, that lives next to the
//! `mtctl` executable by default:
//!
//! ```toml
//! [instances.main]
//! address = "10.0.0.5"
//! port = 8080
//! secret = "hunter2"
//! ```
//!
//! The document path is resolved once at startup (see [`resolve_registry_path`])
//! and passed explicitly to [`Registry::load`] and [`Registry::save`].
//!
//! Path precedence (highest wins):
//!
//! 1. `--instances <path>` CLI flag
//! 2. `MTCTL_INSTANCES` environment variable
//! 3. `instances.toml` beside the executable
//!
//! The first two arrive together as one clap argument; this module only
//! supplies the default.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::validate::{self, ValidationError};

/// File name of the registry document.
pub const REGISTRY_FILE_NAME: &str = "instances.toml";

/// Environment variable overriding the registry path.
pub const REGISTRY_PATH_ENV: &str = "MTCTL_INSTANCES";

/// One administratively reachable server endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// IPv4 dotted-quad.
    pub address: String,
    pub port: u16,
    /// Shared secret, sent as the `password` query parameter.
    pub secret: String,
}

impl InstanceRecord {
    /// Re-check an already-typed record (e.g. one read from disk).
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::validate_address(&self.address)?;
        validate::validate_secret(&self.secret)?;
        Ok(())
    }

    /// `address:port`, as shown in instance listings.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Errors loading or persisting the registry document.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The document exists but could not be read, parsed or validated.
    #[error("failed to load config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
    /// The document could not be written.
    #[error("failed to write config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Named instances, keyed by instance name.
///
/// Storage is unordered; listings sort names via [`Registry::sorted_names`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    instances: HashMap<String, InstanceRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the registry document at `path`.
    ///
    /// A missing file yields an empty registry. A file that exists but cannot
    /// be parsed, or that contains an invalid entry, is a [`RegistryError::Config`].
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No registry at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(RegistryError::Config {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };

        let registry: Registry =
            toml::from_str(&contents).map_err(|e| RegistryError::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        for (name, record) in &registry.instances {
            validate::validate_name(name)
                .and_then(|_| record.validate())
                .map_err(|e| RegistryError::Config {
                    path: path.to_path_buf(),
                    reason: format!("instance '{name}': {e}"),
                })?;
        }

        debug!(
            "Loaded {} instance(s) from {}",
            registry.instances.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Write the whole registry back to `path`, replacing the previous document.
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let contents = toml::to_string_pretty(self).map_err(|e| RegistryError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        std::fs::write(path, contents).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Saved {} instance(s) to {}",
            self.instances.len(),
            path.display()
        );
        Ok(())
    }

    /// Insert or overwrite `name` with a complete record.
    pub fn add_or_replace(&mut self, name: impl Into<String>, record: InstanceRecord) {
        self.instances.insert(name.into(), record);
    }

    pub fn get(&self, name: &str) -> Option<&InstanceRecord> {
        self.instances.get(name)
    }

    /// Remove `name`. Returns `true` iff it existed.
    pub fn delete(&mut self, name: &str) -> bool {
        self.instances.remove(name).is_some()
    }

    /// Instance names sorted lexicographically, for display and numbered selection.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instances.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Resolve the registry document path: the override from the command line
/// (flag or `MTCTL_INSTANCES`), else `instances.toml` beside the executable.
pub fn resolve_registry_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => default_registry_path(),
    }
}

/// `instances.toml` in the executable's directory, or in the working
/// directory if the executable path is unavailable.
pub fn default_registry_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(REGISTRY_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(REGISTRY_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: &str, port: u16, secret: &str) -> InstanceRecord {
        InstanceRecord {
            address: address.into(),
            port,
            secret: secret.into(),
        }
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = Registry::load(&dir.path().join("instances.toml")).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.toml");

        let mut reg = Registry::new();
        reg.add_or_replace("main", record("10.0.0.5", 8080, "hunter2"));
        reg.add_or_replace("backup-2", record("192.168.1.20", 0, &"k".repeat(72)));
        reg.save(&path).unwrap();

        assert_eq!(Registry::load(&path).unwrap(), reg);
    }

    #[test]
    fn saved_document_uses_instances_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.toml");
        let mut reg = Registry::new();
        reg.add_or_replace("main", record("10.0.0.5", 8080, "hunter2"));
        reg.save(&path).unwrap();

        let table: toml::Table = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let main = &table["instances"]["main"];
        assert_eq!(main["address"].as_str(), Some("10.0.0.5"));
        assert_eq!(main["port"].as_integer(), Some(8080));
        assert_eq!(main["secret"].as_str(), Some("hunter2"));
    }

    #[test]
    fn load_accepts_document_without_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.toml");
        std::fs::write(&path, "").unwrap();
        assert!(Registry::load(&path).unwrap().is_empty());
    }

    #[test]
    fn load_rejects_unparsable_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.toml");
        std::fs::write(&path, "instances = [not toml").unwrap();
        assert!(matches!(
            Registry::load(&path),
            Err(RegistryError::Config { .. })
        ));
    }

    #[test]
    fn load_rejects_out_of_range_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.toml");
        std::fs::write(
            &path,
            "[instances.main]\naddress = \"10.0.0.5\"\nport = 70000\nsecret = \"s\"\n",
        )
        .unwrap();
        assert!(matches!(
            Registry::load(&path),
            Err(RegistryError::Config { .. })
        ));
    }

    #[test]
    fn load_rejects_invalid_entry_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.toml");
        std::fs::write(
            &path,
            "[instances.main]\naddress = \"1.2.3.999\"\nport = 8080\nsecret = \"s\"\n",
        )
        .unwrap();
        let err = Registry::load(&path).unwrap_err();
        assert!(err.to_string().contains("instance 'main'"));
    }

    #[test]
    fn save_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("instances.toml");
        let err = Registry::new().save(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
    }

    #[test]
    fn add_then_get_returns_record() {
        let mut reg = Registry::new();
        let rec = record("127.0.0.1", 7777, "pw");
        reg.add_or_replace("main", rec.clone());
        assert_eq!(reg.get("main"), Some(&rec));
    }

    #[test]
    fn add_replaces_whole_record() {
        let mut reg = Registry::new();
        reg.add_or_replace("main", record("127.0.0.1", 7777, "old"));
        reg.add_or_replace("main", record("10.0.0.1", 8080, "new"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("main"), Some(&record("10.0.0.1", 8080, "new")));
    }

    #[test]
    fn delete_absent_leaves_registry_unchanged() {
        let mut reg = Registry::new();
        reg.add_or_replace("main", record("127.0.0.1", 7777, "pw"));
        let before = reg.clone();
        assert!(!reg.delete("other"));
        assert_eq!(reg, before);
    }

    #[test]
    fn delete_present_removes_only_that_entry() {
        let mut reg = Registry::new();
        reg.add_or_replace("a", record("127.0.0.1", 1, "pw"));
        reg.add_or_replace("b", record("127.0.0.1", 2, "pw"));
        assert!(reg.delete("a"));
        assert!(reg.get("a").is_none());
        assert!(reg.get("b").is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn sorted_names_are_lexicographic() {
        let mut reg = Registry::new();
        for name in ["zeta", "alpha", "mid"] {
            reg.add_or_replace(name, record("127.0.0.1", 1, "pw"));
        }
        assert_eq!(reg.sorted_names(), vec!["alpha", "mid", "zeta"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn explicit_path_wins() {
        let p = Path::new("/tmp/custom.toml");
        assert_eq!(resolve_registry_path(Some(p)), PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn no_override_uses_default() {
        assert_eq!(resolve_registry_path(None), default_registry_path());
    }

    #[test]
    fn default_path_is_beside_executable() {
        let path = default_registry_path();
        assert!(path.ends_with(REGISTRY_FILE_NAME));
    }

    #[test]
    fn record_validate_checks_address_and_secret() {
        assert!(record("10.0.0.5", 8080, "pw").validate().is_ok());
        assert!(record("10.0.0", 8080, "pw").validate().is_err());
        assert!(record("10.0.0.5", 8080, "").validate().is_err());
    }
}
