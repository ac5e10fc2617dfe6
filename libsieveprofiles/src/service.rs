//! Service facade for sieve profiles
//!
//! `SieveProfiles` bundles the stateless services around one storage
//! configuration, so callers (the editor UI, the CLI) get a single entry
//! point:
//!
//! - `ProfileStore`: load/write one named profile
//! - `ProfileRegistry`: list profiles, check existence
//! - `LastUsedTracker`: remember the most recently active profile
//! - `LegacyMigrator`: copy the pre-profile settings file once
//!
//! # Example
//!
//! ```no_run
//! use libsieveprofiles::SieveProfiles;
//!
//! # fn example() -> libsieveprofiles::Result<()> {
//! let profiles = SieveProfiles::from_env()?;
//! profiles.migrate_legacy()?;
//!
//! let name = profiles.last_used_profile();
//! let mut store = profiles.open(Some(&name))?;
//! store.load()?;
//! println!("{}:{}", store.server(), store.port());
//! # Ok(())
//! # }
//! ```

use crate::codec::SecretCodec;
use crate::config::{Config, StoreConfig};
use crate::error::Result;
use crate::last_used::LastUsedTracker;
use crate::migrate::{LegacyMigrator, MigrationOutcome};
use crate::profile::ProfileStore;
use crate::registry::ProfileRegistry;

/// Main entry point for profile operations
#[derive(Debug, Clone)]
pub struct SieveProfiles {
    config: StoreConfig,
    codec: SecretCodec,
    registry: ProfileRegistry,
    last_used: LastUsedTracker,
    migrator: LegacyMigrator,
}

impl SieveProfiles {
    /// Create the facade for explicit storage locations
    pub fn new(config: StoreConfig) -> Self {
        Self::with_codec(config, SecretCodec::default())
    }

    /// Create the facade with an explicit password codec
    pub fn with_codec(config: StoreConfig, codec: SecretCodec) -> Self {
        Self {
            registry: ProfileRegistry::new(&config),
            last_used: LastUsedTracker::new(&config),
            migrator: LegacyMigrator::new(&config),
            config,
            codec,
        }
    }

    /// Create the facade from the config file and home directory
    pub fn from_env() -> Result<Self> {
        let config = Config::load()?.store_config()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Open a handle on a profile (`None` means `"default"`)
    ///
    /// The handle starts with default values; call `load()` to read the record.
    pub fn open(&self, name: Option<&str>) -> Result<ProfileStore> {
        ProfileStore::with_codec(&self.config, name, self.codec.clone())
    }

    pub fn available_profiles(&self) -> Vec<String> {
        self.registry.available_profiles()
    }

    pub fn profile_exists(&self, name: &str) -> bool {
        self.registry.profile_exists(name)
    }

    pub fn last_used_profile(&self) -> String {
        self.last_used.get()
    }

    pub fn save_last_used_profile(&self, name: &str) -> Result<()> {
        self.last_used.save(name)
    }

    pub fn migrate_legacy(&self) -> Result<MigrationOutcome> {
        self.migrator.migrate()
    }
}
