//! Error types for sieve profile storage

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SieveProfilesError>;

#[derive(Error, Debug)]
pub enum SieveProfilesError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
}

impl SieveProfilesError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SieveProfilesError::Profile(ProfileError::InvalidName(_)) => 3,
            SieveProfilesError::Profile(_) => 1,
            SieveProfilesError::Config(_) => 1,
            SieveProfilesError::Storage(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failures of the underlying durable storage.
///
/// These are the only failures surfaced by load, write and the last-used
/// record; everything else degrades to a default value.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy '{}' to '{}': {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Invalid profile name: {0}")]
    InvalidName(String),

    #[error("Password encryption failed: {0}")]
    Encryption(String),
}
