//! Named connection profiles for a sieve server
//!
//! Each profile lives in `<root>/<name>.properties` with the keys
//! `sieve.server`, `sieve.port`, `sieve.user` and `sieve.password`. The
//! password is stored encrypted (see [`crate::codec`]) and only ever held in
//! cleartext in memory.
//!
//! # Example
//!
//! ```no_run
//! use libsieveprofiles::config::StoreConfig;
//! use libsieveprofiles::profile::ProfileStore;
//!
//! # fn example() -> libsieveprofiles::error::Result<()> {
//! let config = StoreConfig::resolve()?;
//!
//! let mut work = ProfileStore::new(&config, Some("work"))?;
//! work.load()?;
//! work.set_server("sieve.example.com");
//! work.set_password("s3cret");
//! work.write()?;
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::codec::SecretCodec;
use crate::config::StoreConfig;
use crate::error::{ProfileError, Result, StorageError};
use crate::properties::{self, Properties};

/// Name used when no profile is given
pub const DEFAULT_PROFILE: &str = "default";

/// Standard ManageSieve port
pub const DEFAULT_PORT: u16 = 4190;

/// File extension identifying a profile record
pub const RECORD_EXTENSION: &str = "properties";

const KEY_SERVER: &str = "sieve.server";
const KEY_PORT: &str = "sieve.port";
const KEY_USER: &str = "sieve.user";
const KEY_PASSWORD: &str = "sieve.password";

/// Validate a profile name
///
/// Any name that maps to a plain file directly inside the storage root is
/// accepted, so records written by older tools (`my work`, `Jürgen`) stay
/// openable. Rejected:
/// - empty names
/// - names starting with a dot (keeps them clear of `.lastused` and `..`)
/// - path separators and NUL
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ProfileError::InvalidName("name cannot be empty".to_string()).into());
    }

    if name.starts_with('.') {
        return Err(ProfileError::InvalidName(format!("'{}' cannot start with a dot", name)).into());
    }

    if name.contains(['/', '\\', '\0']) {
        return Err(ProfileError::InvalidName(format!(
            "'{}' must not contain path separators",
            name
        ))
        .into());
    }

    Ok(())
}

/// Path of the record for a profile name
pub fn record_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{}.{}", name, RECORD_EXTENSION))
}

/// Create the storage root if it is missing
///
/// Succeeds when the directory already exists, including when another
/// process created it concurrently.
pub(crate) fn ensure_root(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root).map_err(|source| StorageError::CreateDir {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Open a file for writing, created readable only by its owner
///
/// An existing file is tightened to `0600` before anything is written to it.
fn open_private(path: &Path, options: &mut OpenOptions) -> std::io::Result<File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        let file = options.mode(0o600).open(path)?;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        Ok(file)
    }

    #[cfg(not(unix))]
    {
        options.open(path)
    }
}

/// Replace a file's contents, keeping it readable only by its owner
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let write_error = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = open_private(
        path,
        OpenOptions::new().write(true).create(true).truncate(true),
    )
    .map_err(write_error)?;
    file.write_all(contents).map_err(write_error)?;

    Ok(())
}

/// In-memory settings of one profile
#[derive(Clone, Serialize)]
pub struct Profile {
    pub server: String,
    pub port: u16,
    pub username: String,
    #[serde(skip)]
    password: Zeroizing<String>,
}

impl Profile {
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: Zeroizing::new(String::new()),
        }
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &if self.has_password() { "<redacted>" } else { "" })
            .finish()
    }
}

/// Handle on one named profile record
///
/// Accessors and setters only touch memory; [`load`](Self::load) and
/// [`write`](Self::write) are the only operations that reach the disk.
#[derive(Debug)]
pub struct ProfileStore {
    name: String,
    root: PathBuf,
    codec: SecretCodec,
    profile: Profile,
}

impl ProfileStore {
    /// Create a handle for `name` (or `"default"`) using the built-in codec
    ///
    /// Creates the storage root if it does not exist yet.
    pub fn new(config: &StoreConfig, name: Option<&str>) -> Result<Self> {
        Self::with_codec(config, name, SecretCodec::default())
    }

    /// Create a handle with an explicit password codec
    pub fn with_codec(
        config: &StoreConfig,
        name: Option<&str>,
        codec: SecretCodec,
    ) -> Result<Self> {
        let name = name.unwrap_or(DEFAULT_PROFILE);
        validate_profile_name(name)?;
        ensure_root(&config.root)?;

        Ok(Self {
            name: name.to_string(),
            root: config.root.clone(),
            codec,
            profile: Profile::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_path(&self) -> PathBuf {
        record_path(&self.root, &self.name)
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Read the record into memory
    ///
    /// A missing record is created empty first, so a fresh profile loads as
    /// all defaults. An undecryptable password loads as empty.
    pub fn load(&mut self) -> Result<()> {
        ensure_root(&self.root)?;
        let path = self.record_path();

        if !path.exists() {
            create_empty_record(&path)?;
        }

        let bytes = std::fs::read(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;
        let record = properties::parse(&properties::decode_text(bytes));

        self.profile.server = record.get(KEY_SERVER).cloned().unwrap_or_default();
        self.profile.username = record.get(KEY_USER).cloned().unwrap_or_default();
        self.profile.port = match record.get(KEY_PORT).map(|raw| raw.trim().parse::<u16>()) {
            Some(Ok(port)) => port,
            Some(Err(e)) => {
                tracing::debug!(
                    "Unparseable port in profile '{}' ({}), using {}",
                    self.name,
                    e,
                    DEFAULT_PORT
                );
                DEFAULT_PORT
            }
            None => DEFAULT_PORT,
        };

        let stored_password = record.get(KEY_PASSWORD).map(String::as_str).unwrap_or("");
        self.profile.password = Zeroizing::new(self.decode_password(stored_password));

        tracing::debug!("Loaded profile '{}' from {:?}", self.name, path);
        Ok(())
    }

    fn decode_password(&self, stored: &str) -> String {
        if stored.is_empty() {
            return String::new();
        }

        if !SecretCodec::is_encrypted(stored) {
            tracing::debug!(
                "Profile '{}' holds a plaintext password; it will be encrypted on next write",
                self.name
            );
            return stored.to_string();
        }

        match self.codec.try_decrypt(stored) {
            Ok(password) => password,
            Err(e) => {
                tracing::warn!(
                    "Stored password for profile '{}' could not be decrypted ({}); treating it as unset",
                    self.name,
                    e
                );
                String::new()
            }
        }
    }

    /// Persist the in-memory settings, replacing the whole record
    pub fn write(&self) -> Result<()> {
        ensure_root(&self.root)?;
        let path = self.record_path();

        let mut record = Properties::new();
        record.insert(KEY_SERVER.to_string(), self.profile.server.clone());
        record.insert(KEY_PORT.to_string(), self.profile.port.to_string());
        record.insert(KEY_USER.to_string(), self.profile.username.clone());
        record.insert(
            KEY_PASSWORD.to_string(),
            self.codec.encrypt(&self.profile.password)?,
        );

        write_private(&path, properties::to_string(&record).as_bytes())?;

        tracing::debug!("Stored profile '{}' at {:?}", self.name, path);
        Ok(())
    }

    pub fn server(&self) -> &str {
        &self.profile.server
    }

    pub fn port(&self) -> u16 {
        self.profile.port
    }

    pub fn username(&self) -> &str {
        &self.profile.username
    }

    pub fn password(&self) -> &str {
        self.profile.password()
    }

    /// Set the server host; `None` clears it
    pub fn set_server<'a>(&mut self, server: impl Into<Option<&'a str>>) {
        self.profile.server = server.into().unwrap_or_default().to_string();
    }

    pub fn set_port(&mut self, port: u16) {
        self.profile.port = port;
    }

    /// Set the username; `None` clears it
    pub fn set_username<'a>(&mut self, username: impl Into<Option<&'a str>>) {
        self.profile.username = username.into().unwrap_or_default().to_string();
    }

    /// Set the password; `None` clears it
    pub fn set_password<'a>(&mut self, password: impl Into<Option<&'a str>>) {
        self.profile.password = Zeroizing::new(password.into().unwrap_or_default().to_string());
    }
}

fn create_empty_record(path: &Path) -> Result<()> {
    let created = open_private(path, OpenOptions::new().write(true).create_new(true));

    match created {
        Ok(_) => {
            tracing::debug!("Created empty profile record at {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(StorageError::Write {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> StoreConfig {
        StoreConfig::from_home(temp_dir.path())
    }

    #[test]
    fn test_validate_profile_name_valid() {
        assert!(validate_profile_name("default").is_ok());
        assert!(validate_profile_name("test-profile_123").is_ok());
        assert!(validate_profile_name("work.example").is_ok());
        assert!(validate_profile_name("my work").is_ok());
        assert!(validate_profile_name("Jürgen").is_ok());
        assert!(validate_profile_name(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_profile_name_invalid() {
        assert!(validate_profile_name("").is_err());
        assert!(validate_profile_name(".lastused").is_err());
        assert!(validate_profile_name("..").is_err());
        assert!(validate_profile_name("../escape").is_err());
        assert!(validate_profile_name("sub/dir").is_err());
        assert!(validate_profile_name("sub\\dir").is_err());
        assert!(validate_profile_name("nul\0byte").is_err());
    }

    #[test]
    fn test_invalid_name_message_is_not_repeated() {
        let err = validate_profile_name("sub/dir").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Profile error: Invalid profile name: 'sub/dir' must not contain path separators"
        );
    }

    #[test]
    fn test_new_rejects_invalid_name() {
        let temp_dir = TempDir::new().unwrap();
        let result = ProfileStore::new(&test_config(&temp_dir), Some("../evil"));
        assert!(matches!(
            result,
            Err(crate::error::SieveProfilesError::Profile(ProfileError::InvalidName(_)))
        ));
    }

    #[test]
    fn test_new_defaults_to_default_profile() {
        let temp_dir = TempDir::new().unwrap();
        let store = ProfileStore::new(&test_config(&temp_dir), None).unwrap();
        assert_eq!(store.name(), "default");
        assert_eq!(
            store.record_path(),
            temp_dir.path().join(".sieveprofiles").join("default.properties")
        );
    }

    #[test]
    fn test_new_creates_root_idempotently() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        assert!(!config.root.exists());

        ProfileStore::new(&config, Some("a")).unwrap();
        ProfileStore::new(&config, Some("b")).unwrap();
        assert!(config.root.is_dir());
    }

    #[test]
    fn test_setters_and_getters_do_not_touch_disk() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = ProfileStore::new(&test_config(&temp_dir), None).unwrap();

        store.set_server("mail.example.com");
        store.set_port(2000);
        store.set_username("testuser");
        store.set_password("secretpassword");

        assert_eq!(store.server(), "mail.example.com");
        assert_eq!(store.port(), 2000);
        assert_eq!(store.username(), "testuser");
        assert_eq!(store.password(), "secretpassword");
        assert!(!store.record_path().exists());
    }

    #[test]
    fn test_setters_normalize_none() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = ProfileStore::new(&test_config(&temp_dir), None).unwrap();
        store.set_server("x");
        store.set_server(None::<&str>);
        store.set_username(None::<&str>);
        store.set_password(None::<&str>);

        assert_eq!(store.server(), "");
        assert_eq!(store.username(), "");
        assert_eq!(store.password(), "");
    }

    #[test]
    fn test_plaintext_password_is_read_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut store = ProfileStore::new(&config, None).unwrap();
        std::fs::write(store.record_path(), "sieve.password=legacy-plain\n").unwrap();

        store.load().unwrap();
        assert_eq!(store.password(), "legacy-plain");

        store.write().unwrap();
        let raw = std::fs::read_to_string(store.record_path()).unwrap();
        assert!(!raw.contains("legacy-plain"));
        assert!(raw.contains("sieve.password=ENC("));
    }

    #[test]
    fn test_unparseable_port_uses_default() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = ProfileStore::new(&test_config(&temp_dir), None).unwrap();
        std::fs::write(store.record_path(), "sieve.port=not-a-number\n").unwrap();

        store.load().unwrap();
        assert_eq!(store.port(), DEFAULT_PORT);

        std::fs::write(store.record_path(), "sieve.port=99999\n").unwrap();
        store.load().unwrap();
        assert_eq!(store.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_port_with_whitespace() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = ProfileStore::new(&test_config(&temp_dir), None).unwrap();
        std::fs::write(store.record_path(), "sieve.port = 2000  \n").unwrap();

        store.load().unwrap();
        assert_eq!(store.port(), 2000);
    }

    #[test]
    fn test_wrong_key_loads_empty_password() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let mut writer =
            ProfileStore::with_codec(&config, None, SecretCodec::from_passphrase("one")).unwrap();
        writer.set_password("secret");
        writer.write().unwrap();

        let mut reader =
            ProfileStore::with_codec(&config, None, SecretCodec::from_passphrase("two")).unwrap();
        reader.load().unwrap();
        assert_eq!(reader.password(), "");
    }

    #[test]
    fn test_write_overwrites_whole_record() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = ProfileStore::new(&test_config(&temp_dir), None).unwrap();
        std::fs::write(store.record_path(), "unrelated.key=stale\n").unwrap();

        store.load().unwrap();
        store.write().unwrap();

        let raw = std::fs::read_to_string(store.record_path()).unwrap();
        assert!(!raw.contains("unrelated.key"));
    }

    #[test]
    #[cfg(unix)]
    fn test_record_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let mut store = ProfileStore::new(&test_config(&temp_dir), None).unwrap();
        store.set_password("secret");
        store.write().unwrap();

        let metadata = std::fs::metadata(store.record_path()).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    #[cfg(unix)]
    fn test_empty_record_created_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let mut store = ProfileStore::new(&test_config(&temp_dir), None).unwrap();
        store.load().unwrap();

        let metadata = std::fs::metadata(store.record_path()).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    #[cfg(unix)]
    fn test_write_private_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.properties");
        std::fs::write(&path, "sieve.server=old\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_private(&path, b"sieve.server=new\n").unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "sieve.server=new\n");
    }

    #[test]
    fn test_non_ascii_name_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let mut store = ProfileStore::new(&config, Some("Jürgen")).unwrap();
        store.set_server("mail.example.de");
        store.write().unwrap();

        let mut loaded = ProfileStore::new(&config, Some("Jürgen")).unwrap();
        loaded.load().unwrap();
        assert_eq!(loaded.server(), "mail.example.de");
        assert!(config.root.join("Jürgen.properties").is_file());
    }

    #[test]
    fn test_debug_redacts_password() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = ProfileStore::new(&test_config(&temp_dir), None).unwrap();
        store.set_password("hunter2");

        let debug = format!("{:?}", store);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
