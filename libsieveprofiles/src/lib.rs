//! Sieve profiles - connection settings and credentials for sieve servers
//!
//! This library persists named profiles (server, port, username, password)
//! for a ManageSieve client, keeps the password encrypted at rest, tracks the
//! last active profile and migrates the legacy single-profile settings file.

pub mod codec;
pub mod config;
pub mod error;
pub mod last_used;
pub mod logging;
pub mod migrate;
pub mod profile;
pub mod properties;
pub mod registry;
pub mod service;

// Re-export commonly used types
pub use codec::SecretCodec;
pub use config::{Config, StoreConfig};
pub use error::{Result, SieveProfilesError};
pub use migrate::MigrationOutcome;
pub use profile::{Profile, ProfileStore, DEFAULT_PORT, DEFAULT_PROFILE};
pub use service::SieveProfiles;
