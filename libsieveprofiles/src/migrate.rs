//! One-time migration of the legacy single-profile settings file
//!
//! Before profiles existed, settings lived in `~/.sieveproperties`. On
//! startup that file is copied verbatim to `<root>/default.properties`,
//! unless a default profile already exists. The copy is structural: values
//! are not re-encoded, so a legacy plaintext password stays as it is until
//! the profile is next written.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::{Result, StorageError};
use crate::profile::{ensure_root, record_path, DEFAULT_PROFILE};

/// Result of a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No legacy file, nothing to do
    NoLegacyRecord,
    /// A default profile already exists and was left untouched
    DefaultExists,
    /// The legacy file was copied into the default profile
    Migrated,
}

impl MigrationOutcome {
    pub fn is_migrated(&self) -> bool {
        matches!(self, MigrationOutcome::Migrated)
    }
}

#[derive(Debug, Clone)]
pub struct LegacyMigrator {
    legacy_file: PathBuf,
    root: PathBuf,
}

impl LegacyMigrator {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            legacy_file: config.legacy_file.clone(),
            root: config.root.clone(),
        }
    }

    /// Copy the legacy record into the default profile if needed
    ///
    /// Safe to call on every start. The destination is opened with
    /// create-new semantics, so a default profile that appears concurrently
    /// is never overwritten.
    pub fn migrate(&self) -> Result<MigrationOutcome> {
        if !self.legacy_file.is_file() {
            return Ok(MigrationOutcome::NoLegacyRecord);
        }

        let target = record_path(&self.root, DEFAULT_PROFILE);
        if target.exists() {
            tracing::debug!(
                "Default profile already exists at {:?}, skipping legacy migration",
                target
            );
            return Ok(MigrationOutcome::DefaultExists);
        }

        let copy_error = |source| StorageError::Copy {
            from: self.legacy_file.clone(),
            to: target.clone(),
            source,
        };

        let content = std::fs::read(&self.legacy_file).map_err(copy_error)?;
        ensure_root(&self.root)?;

        let created = create_record(&target, |file| file.write_all(&content)).map_err(copy_error)?;
        if !created {
            return Ok(MigrationOutcome::DefaultExists);
        }

        tracing::info!(
            "Migrated legacy settings from {:?} to profile '{}'",
            self.legacy_file,
            DEFAULT_PROFILE
        );
        Ok(MigrationOutcome::Migrated)
    }
}

/// Create `target` and fill it with `fill`
///
/// Returns `Ok(false)` if the file already exists. On a failed write the
/// partial file is removed, so a later run can retry the copy.
fn create_record(
    target: &Path,
    fill: impl FnOnce(&mut File) -> std::io::Result<()>,
) -> std::io::Result<bool> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = match options.open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };

    if let Err(e) = fill(&mut file).and_then(|()| file.sync_all()) {
        drop(file);
        if let Err(cleanup) = std::fs::remove_file(target) {
            tracing::warn!("Failed to remove partial record {:?}: {}", target, cleanup);
        }
        return Err(e);
    }

    Ok(true)
}
