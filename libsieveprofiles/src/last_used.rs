//! Tracking of the most recently active profile
//!
//! The name is kept in `<root>/.lastused` as a single line of text,
//! independent of any profile record.

use std::path::PathBuf;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::profile::{ensure_root, write_private, DEFAULT_PROFILE};

/// File name of the last-used record inside the storage root
pub const LAST_USED_FILE_NAME: &str = ".lastused";

#[derive(Debug, Clone)]
pub struct LastUsedTracker {
    root: PathBuf,
}

impl LastUsedTracker {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            root: config.root.clone(),
        }
    }

    fn record_path(&self) -> PathBuf {
        self.root.join(LAST_USED_FILE_NAME)
    }

    /// Record `name` as the most recently active profile
    pub fn save(&self, name: &str) -> Result<()> {
        ensure_root(&self.root)?;
        let path = self.record_path();
        write_private(&path, name.as_bytes())?;

        tracing::debug!("Saved last used profile '{}' to {:?}", name, path);
        Ok(())
    }

    /// Name of the most recently active profile
    ///
    /// Returns `"default"` when nothing was recorded yet. A record holding
    /// only whitespace yields the empty string, which callers can tell apart
    /// from "never recorded".
    pub fn get(&self) -> String {
        let path = self.record_path();

        match std::fs::read_to_string(&path) {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DEFAULT_PROFILE.to_string(),
            Err(e) => {
                tracing::warn!("Cannot read last used profile from {:?}: {}", path, e);
                DEFAULT_PROFILE.to_string()
            }
        }
    }
}
