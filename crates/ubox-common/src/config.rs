//! Runtime configuration model and loading.
//!
//! Values are resolved in this order, later overriding earlier:
//! 1. Built-in defaults
//! 2. `/etc/ubox.toml`, then `$HOME/.ubox/ubox.toml` (or one explicit file)
//! 3. `UBOX_DIR`, `UBOX_TMP` and `UBOX_LOGLEVEL` environment variables
//! 4. Command-line flags, applied by the caller after loading
//!
//! Files are partial: a file only needs the keys it overrides. Keys the
//! model does not know are kept in [`RuntimeConfig::extra`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, UboxError};
use crate::types::Verbosity;

/// Process-wide configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Root of the local repository.
    pub topdir: PathBuf,
    /// Scratch directory for temporary files.
    pub tmpdir: PathBuf,
    /// Credentials store, relative paths resolve against `topdir`.
    pub keystore: PathBuf,
    /// Output verbosity.
    pub verbose_level: Verbosity,
    /// Skip TLS verification in network collaborators.
    pub http_insecure: bool,
    /// Network timeout in seconds.
    pub timeout: u64,
    /// Docker Hub index URL.
    pub dockerio_index_url: String,
    /// Docker Hub registry URL.
    pub dockerio_registry_url: String,
    /// Settings without a dedicated field.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            topdir: constants::user_dir(),
            tmpdir: constants::default_tmpdir(),
            keystore: PathBuf::from("keystore"),
            verbose_level: Verbosity::default(),
            http_insecure: false,
            timeout: constants::DEFAULT_TIMEOUT_SECS,
            dockerio_index_url: constants::DOCKERIO_INDEX_URL.to_string(),
            dockerio_registry_url: constants::DOCKERIO_REGISTRY_URL.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if a value in `extra` cannot be represented.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| UboxError::Config {
            message: e.to_string(),
        })
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `UBOX_LOGLEVEL` holds an unknown level.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup(constants::ENV_DIR).filter(|v| !v.is_empty()) {
            self.topdir = PathBuf::from(dir);
        }
        if let Some(tmp) = lookup(constants::ENV_TMP).filter(|v| !v.is_empty()) {
            self.tmpdir = PathBuf::from(tmp);
        }
        if let Some(level) = lookup(constants::ENV_LOGLEVEL).filter(|v| !v.is_empty()) {
            self.verbose_level = level.parse()?;
        }
        Ok(())
    }
}

/// Produces the runtime configuration.
pub trait ConfigSource {
    /// Loads the configuration, from `explicit` alone when given.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file exists but cannot be read
    /// or parsed.
    fn load(&self, explicit: Option<&Path>) -> Result<RuntimeConfig>;
}

/// Loads configuration from TOML files and the process environment.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    search_paths: Vec<PathBuf>,
    use_env: bool,
}

impl Default for FileConfigSource {
    fn default() -> Self {
        Self {
            search_paths: vec![
                PathBuf::from(constants::SYSTEM_CONFIG_FILE),
                constants::user_dir().join(constants::USER_CONFIG_FILE),
            ],
            use_env: true,
        }
    }
}

impl FileConfigSource {
    /// Creates a source searching only `search_paths`, ignoring the environment.
    #[must_use]
    pub const fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            use_env: false,
        }
    }

    fn read_table(path: &Path) -> Result<toml::Table> {
        let content = std::fs::read_to_string(path).map_err(|e| UboxError::io(path, e))?;
        content.parse::<toml::Table>().map_err(|e| UboxError::Config {
            message: format!("{}: {e}", path.display()),
        })
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self, explicit: Option<&Path>) -> Result<RuntimeConfig> {
        let defaults =
            toml::Value::try_from(RuntimeConfig::default()).map_err(|e| UboxError::Config {
                message: e.to_string(),
            })?;
        let mut merged = match defaults {
            toml::Value::Table(table) => table,
            _ => toml::Table::new(),
        };

        let candidates: Vec<&Path> = match explicit {
            Some(path) => {
                if !path.exists() {
                    tracing::warn!(path = %path.display(), "config file not found, using defaults");
                }
                vec![path]
            }
            None => self.search_paths.iter().map(PathBuf::as_path).collect(),
        };

        for path in candidates.into_iter().filter(|p| p.exists()) {
            tracing::debug!(path = %path.display(), "loading config file");
            merged.extend(Self::read_table(path)?);
        }

        let mut config: RuntimeConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e| UboxError::Config {
                message: e.to_string(),
            })?;

        if self.use_env {
            config.apply_env(|key| std::env::var(key).ok())?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write config");
        path
    }

    #[test]
    fn load_without_files_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = FileConfigSource::with_search_paths(vec![dir.path().join("absent.toml")]);
        let config = source.load(None).expect("load");
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        let system = write(dir.path(), "system.toml", "timeout = 30\nhttp_insecure = true\n");
        let user = write(dir.path(), "user.toml", "timeout = 5\n");
        let config = FileConfigSource::with_search_paths(vec![system, user])
            .load(None)
            .expect("load");
        assert_eq!(config.timeout, 5);
        assert!(config.http_insecure);
    }

    #[test]
    fn explicit_file_skips_search_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let searched = write(dir.path(), "searched.toml", "timeout = 99\n");
        let explicit = write(dir.path(), "explicit.toml", "verbose_level = \"debug\"\n");
        let config = FileConfigSource::with_search_paths(vec![searched])
            .load(Some(&explicit))
            .expect("load");
        assert_eq!(config.verbose_level, Verbosity::Debug);
        assert_eq!(config.timeout, constants::DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn missing_explicit_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = FileConfigSource::with_search_paths(Vec::new())
            .load(Some(&dir.path().join("nope.toml")))
            .expect("load");
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn unknown_keys_are_kept_in_extra() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "c.toml", "use_proot_executable = \"/opt/proot\"\n");
        let config = FileConfigSource::with_search_paths(vec![path])
            .load(None)
            .expect("load");
        assert_eq!(
            config.extra.get("use_proot_executable").and_then(toml::Value::as_str),
            Some("/opt/proot")
        );
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "bad.toml", "timeout = = 3\n");
        let err = FileConfigSource::with_search_paths(vec![path])
            .load(None)
            .expect_err("must fail");
        assert!(matches!(err, UboxError::Config { .. }));
    }

    #[test]
    fn env_overrides_topdir_and_level() {
        let mut config = RuntimeConfig::default();
        config
            .apply_env(|key| match key {
                constants::ENV_DIR => Some("/srv/ubox".into()),
                constants::ENV_LOGLEVEL => Some("1".into()),
                _ => None,
            })
            .expect("apply env");
        assert_eq!(config.topdir, PathBuf::from("/srv/ubox"));
        assert_eq!(config.verbose_level, Verbosity::Message);
    }

    #[test]
    fn renders_as_toml() {
        let rendered = RuntimeConfig::default().to_toml().expect("render");
        assert!(rendered.contains("verbose_level = \"info\""));
    }
}
