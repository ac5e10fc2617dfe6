//! Enumeration of the profiles present under the storage root

use std::path::PathBuf;

use crate::config::StoreConfig;
use crate::profile::{record_path, validate_profile_name, DEFAULT_PROFILE, RECORD_EXTENSION};

/// Read-only view over the profile records in a storage root
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    root: PathBuf,
}

impl ProfileRegistry {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            root: config.root.clone(),
        }
    }

    /// List profile names, sorted ascending
    ///
    /// Never returns an empty list: a missing or empty root (or one that
    /// cannot be read) yields `["default"]`.
    pub fn available_profiles(&self) -> Vec<String> {
        let mut profiles = Vec::new();

        match std::fs::read_dir(&self.root) {
            Ok(entries) => {
                let suffix = format!(".{}", RECORD_EXTENSION);

                for entry in entries.flatten() {
                    if !entry.path().is_file() {
                        continue;
                    }
                    let file_name = entry.file_name();
                    // A name that is not valid UTF-8 cannot be passed back to the store
                    let Some(file_name) = file_name.to_str() else {
                        continue;
                    };

                    // Hidden files such as `.lastused` are never profiles
                    if file_name.starts_with('.') {
                        continue;
                    }
                    let Some(name) = file_name.strip_suffix(&suffix) else {
                        continue;
                    };
                    // Only list what `ProfileStore` will open
                    if validate_profile_name(name).is_ok() {
                        profiles.push(name.to_string());
                    } else {
                        tracing::debug!("Skipping record with unusable name {:?}", file_name);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Cannot list profiles in {:?}: {}", self.root, e);
            }
        }

        if profiles.is_empty() {
            return vec![DEFAULT_PROFILE.to_string()];
        }

        profiles.sort();
        profiles
    }

    /// Check whether a record exists for exactly this name
    ///
    /// Does not create the storage root. Names the store would reject are
    /// never reported as existing.
    pub fn profile_exists(&self, name: &str) -> bool {
        if validate_profile_name(name).is_err() {
            return false;
        }
        record_path(&self.root, name).is_file()
    }
}
