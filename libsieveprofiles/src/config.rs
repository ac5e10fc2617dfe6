//! Configuration management for sieve profile storage
//!
//! Every component receives an explicit [`StoreConfig`] instead of reading the
//! home directory on its own, so tests and callers can point the whole
//! subsystem at any directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Directory (under the home directory) holding all profile records
pub const PROFILES_DIR_NAME: &str = ".sieveprofiles";

/// Pre-multi-profile settings file (under the home directory)
pub const LEGACY_FILE_NAME: &str = ".sieveproperties";

/// Resolved storage locations used by every component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Storage root holding `<name>.properties` records and `.lastused`
    pub root: PathBuf,
    /// Legacy single-profile record, read once by the migrator
    pub legacy_file: PathBuf,
}

impl StoreConfig {
    /// Build the default layout below a home directory
    pub fn from_home(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref();
        Self {
            root: home.join(PROFILES_DIR_NAME),
            legacy_file: home.join(LEGACY_FILE_NAME),
        }
    }

    /// Build the default layout below the resolved home directory
    pub fn resolve() -> Result<Self> {
        Ok(Self::from_home(resolve_home()?))
    }
}

/// Optional on-disk configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides `~/.sieveprofiles`
    #[serde(default)]
    pub root: Option<String>,
    /// Overrides `~/.sieveproperties`
    #[serde(default)]
    pub legacy_file: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Resolve storage locations against the home directory
    pub fn store_config(&self) -> Result<StoreConfig> {
        self.store_config_with_home(&resolve_home()?)
    }

    /// Resolve storage locations against an explicit home directory
    pub fn store_config_with_home(&self, home: &Path) -> Result<StoreConfig> {
        let defaults = StoreConfig::from_home(home);
        Ok(StoreConfig {
            root: self
                .storage
                .root
                .as_deref()
                .map(expand_path)
                .unwrap_or(defaults.root),
            legacy_file: self
                .storage
                .legacy_file
                .as_deref()
                .map(expand_path)
                .unwrap_or(defaults.legacy_file),
        })
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the home directory
///
/// `SIEVE_PROFILES_HOME` takes precedence over the user's home directory.
pub fn resolve_home() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SIEVE_PROFILES_HOME") {
        if !path.is_empty() {
            return Ok(expand_path(&path));
        }
    }

    dirs::home_dir().ok_or_else(|| ConfigError::MissingField("home directory".to_string()).into())
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SIEVE_PROFILES_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("sieve-profiles").join("config.toml"))
}
