//! Private per-user storage root with one directory per configuration
//!
//! Layout:
//! ```text
//! <root>/.api-vault/settings.json
//! <root>/.api-vault/salt      (passphrase backend only)
//! <root>/<name>/<name>.json
//! ```
//!
//! Config names never start with `.`, so the metadata directory cannot be
//! taken by a configuration.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{debug, info, warn};

use crate::bundle::{BundleFile, ConfigName, BUNDLE_VERSION};
use crate::crypto::generate_salt;
use crate::error::{Result, VaultError};

/// Environment variable that overrides the storage root
pub const ROOT_ENV: &str = "API_VAULT_HOME";

const META_DIR: &str = ".api-vault";

/// Bundle storage under a private root directory
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    /// Store at `API_VAULT_HOME`, or the platform's local data directory
    pub fn new() -> Result<Self> {
        Ok(Self::with_root(Self::default_root()?))
    }

    /// Create with a custom root (for testing and `--root`)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the default root without touching the filesystem
    pub fn default_root() -> Result<PathBuf> {
        if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(root));
        }

        ProjectDirs::from("com", "api-vault", "api-vault")
            .map(|dirs| dirs.data_local_dir().to_path_buf())
            .ok_or_else(|| {
                VaultError::StorageError("Could not determine data directory".to_string())
            })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self, name: &ConfigName) -> PathBuf {
        self.root.join(name.as_str())
    }

    pub fn bundle_path(&self, name: &ConfigName) -> PathBuf {
        self.config_dir(name).join(name.file_name())
    }

    /// Directory for the store's own files (settings, salt)
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    fn salt_path(&self) -> PathBuf {
        self.meta_dir().join("salt")
    }

    /// Create the root if needed and make sure only the owner can enter it
    pub fn ensure_root(&self) -> Result<()> {
        if self.root.is_dir() {
            restrict_dir(&self.root)
        } else {
            create_private_dir(&self.root)?;
            debug!("Created storage root at {:?}", self.root);
            Ok(())
        }
    }

    /// Create the metadata directory (and the root) with private permissions
    pub fn ensure_meta_dir(&self) -> Result<PathBuf> {
        self.ensure_root()?;
        let dir = self.meta_dir();
        create_private_dir(&dir)?;
        Ok(dir)
    }

    /// Replace whatever is stored for the bundle's name with `file`.
    ///
    /// The config directory is removed and recreated, so no file from an
    /// earlier bundle survives.
    pub fn replace_bundle(&self, file: &BundleFile) -> Result<PathBuf> {
        self.ensure_root()?;

        let dir = self.config_dir(&file.name);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| VaultError::io_at(e, &dir))?;
            debug!("Removed previous configuration directory {:?}", dir);
        }
        create_private_dir(&dir)?;

        let path = self.bundle_path(&file.name);
        let contents = serde_json::to_string_pretty(file)?;
        write_private_file(&path, contents.as_bytes())?;

        info!(
            "Wrote configuration '{}' with {} secret(s) to {:?}",
            file.name,
            file.secrets.len(),
            path
        );
        Ok(path)
    }

    /// Load and validate the bundle stored for `name`
    pub fn load_bundle(&self, name: &ConfigName) -> Result<BundleFile> {
        let path = self.bundle_path(name);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::NotFound(name.to_string()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(corrupt(&path, "file is not valid UTF-8"));
            }
            Err(e) => return Err(VaultError::io_at(e, &path)),
        };

        let file: BundleFile =
            serde_json::from_str(&contents).map_err(|e| corrupt(&path, &e.to_string()))?;

        if file.version != BUNDLE_VERSION {
            return Err(corrupt(
                &path,
                &format!("unsupported bundle version {}", file.version),
            ));
        }
        if &file.name != name {
            return Err(corrupt(
                &path,
                &format!("bundle is named '{}', expected '{}'", file.name, name),
            ));
        }

        debug!("Loaded {} protected value(s) from {:?}", file.secrets.len(), path);
        Ok(file)
    }

    pub fn exists(&self, name: &ConfigName) -> bool {
        self.bundle_path(name).is_file()
    }

    /// Names of all stored configurations, sorted
    pub fn list(&self) -> Result<Vec<ConfigName>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(VaultError::io_at(e, &self.root)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|n| ConfigName::new(n).ok())
            else {
                continue;
            };
            if self.exists(&name) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Delete the configuration directory for `name`
    pub fn remove(&self, name: &ConfigName) -> Result<()> {
        let dir = self.config_dir(name);
        if !dir.is_dir() {
            return Err(VaultError::NotFound(name.to_string()));
        }

        fs::remove_dir_all(&dir).map_err(|e| VaultError::io_at(e, &dir))?;
        info!("Removed configuration '{}'", name);
        Ok(())
    }

    /// Salt for the passphrase backend, created on first use
    pub fn load_or_create_salt(&self) -> Result<String> {
        let path = self.salt_path();

        match fs::read_to_string(&path) {
            Ok(salt) => return Ok(salt.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(VaultError::io_at(e, &path)),
        }

        self.ensure_meta_dir()?;
        let salt = generate_salt();
        write_private_file(&path, salt.as_bytes())?;
        debug!("Saved salt to {:?}", path);
        Ok(salt)
    }
}

fn corrupt(path: &Path, reason: &str) -> VaultError {
    VaultError::CorruptFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn create_private_dir(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    builder.create(path).map_err(|e| VaultError::io_at(e, path))
}

#[cfg(unix)]
fn restrict_dir(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)
        .map_err(|e| VaultError::io_at(e, path))?
        .permissions()
        .mode();

    if mode & 0o077 != 0 {
        warn!(
            "Storage root {:?} is accessible by other users (mode {:o}), restricting to 0700",
            path,
            mode & 0o777
        );
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))
            .map_err(|_| VaultError::PermissionDenied {
                path: path.to_path_buf(),
            })?;
    }
    Ok(())
}

// Per-user application data on Windows is already ACL-restricted to the owner
#[cfg(not(unix))]
fn restrict_dir(_path: &Path) -> Result<()> {
    Ok(())
}

/// Write via a temp file in the same directory, then rename into place
fn write_private_file(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(&temp_path)
        .map_err(|e| VaultError::io_at(e, &temp_path))?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| VaultError::io_at(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::SecretBundle;
    use crate::crypto::{seal, MasterKey};
    use crate::protect::Backend;
    use tempfile::TempDir;

    fn name(s: &str) -> ConfigName {
        ConfigName::new(s).unwrap()
    }

    fn bundle(config: &str, keys: &[&str]) -> BundleFile {
        let key = MasterKey::generate();
        let secrets: SecretBundle = keys
            .iter()
            .map(|k| (k.to_string(), seal(b"value", b"aad", &key).unwrap()))
            .collect();
        BundleFile::new(name(config), Backend::Keyring, secrets)
    }

    #[test]
    fn test_replace_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path().join("vault"));

        let path = store.replace_bundle(&bundle("api1", &["url", "key"])).unwrap();
        assert_eq!(path, temp_dir.path().join("vault").join("api1").join("api1.json"));

        let loaded = store.load_bundle(&name("api1")).unwrap();
        assert_eq!(loaded.secret_names(), vec!["key", "url"]);
    }

    #[test]
    fn test_replace_removes_stale_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());

        store.replace_bundle(&bundle("api1", &["url"])).unwrap();
        let stray = store.config_dir(&name("api1")).join("leftover.txt");
        fs::write(&stray, "old").unwrap();

        store.replace_bundle(&bundle("api1", &["token"])).unwrap();

        assert!(!stray.exists());
        assert_eq!(store.load_bundle(&name("api1")).unwrap().secret_names(), vec!["token"]);
    }

    #[test]
    fn test_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());

        let result = store.load_bundle(&name("nonexistent"));
        assert!(matches!(result, Err(VaultError::NotFound(n)) if n == "nonexistent"));
    }

    #[test]
    fn test_corrupt_and_truncated_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        let path = store.replace_bundle(&bundle("api1", &["url"])).unwrap();
        let original = fs::read_to_string(&path).unwrap();

        fs::write(&path, &original[..original.len() / 2]).unwrap();
        assert!(matches!(
            store.load_bundle(&name("api1")),
            Err(VaultError::CorruptFormat { .. })
        ));

        fs::write(&path, "").unwrap();
        assert!(matches!(
            store.load_bundle(&name("api1")),
            Err(VaultError::CorruptFormat { .. })
        ));

        fs::write(&path, original.replace("\"version\": 1", "\"version\": 7")).unwrap();
        assert!(matches!(
            store.load_bundle(&name("api1")),
            Err(VaultError::CorruptFormat { reason, .. }) if reason.contains("version")
        ));
    }

    #[test]
    fn test_mismatched_name_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        store.replace_bundle(&bundle("api1", &["url"])).unwrap();

        create_private_dir(&store.config_dir(&name("api2"))).unwrap();
        fs::copy(store.bundle_path(&name("api1")), store.bundle_path(&name("api2"))).unwrap();

        assert!(matches!(
            store.load_bundle(&name("api2")),
            Err(VaultError::CorruptFormat { .. })
        ));
    }

    #[test]
    fn test_list_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        assert!(store.list().unwrap().is_empty());

        store.replace_bundle(&bundle("zeta", &["k"])).unwrap();
        store.replace_bundle(&bundle("alpha", &["k"])).unwrap();
        fs::create_dir(temp_dir.path().join("empty-dir")).unwrap();
        store.load_or_create_salt().unwrap();

        assert_eq!(store.list().unwrap(), vec![name("alpha"), name("zeta")]);

        store.remove(&name("alpha")).unwrap();
        assert_eq!(store.list().unwrap(), vec![name("zeta")]);
        assert!(matches!(store.remove(&name("alpha")), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_salt_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());

        let first = store.load_or_create_salt().unwrap();
        let second = store.load_or_create_salt().unwrap();
        assert_eq!(first, second);
        assert!(store.meta_dir().join("salt").is_file());
    }

    #[test]
    fn test_config_names_do_not_clash_with_store_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        let salt = store.load_or_create_salt().unwrap();
        fs::write(store.meta_dir().join("settings.json"), "{}").unwrap();

        for config in ["salt", "settings.json", "api-vault"] {
            store.replace_bundle(&bundle(config, &["k"])).unwrap();
            assert_eq!(store.load_bundle(&name(config)).unwrap().secret_names(), vec!["k"]);
        }

        assert_eq!(store.load_or_create_salt().unwrap(), salt);
        assert_eq!(
            store.list().unwrap(),
            vec![name("api-vault"), name("salt"), name("settings.json")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_private_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("vault");
        let store = ConfigStore::with_root(&root);
        let path = store.replace_bundle(&bundle("api1", &["url"])).unwrap();

        store.load_or_create_salt().unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&root), 0o700);
        assert_eq!(mode(&store.config_dir(&name("api1"))), 0o700);
        assert_eq!(mode(&path), 0o600);
        assert_eq!(mode(&store.meta_dir()), 0o700);
        assert_eq!(mode(&store.meta_dir().join("salt")), 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_parent_is_permission_denied() {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let temp_dir = TempDir::new().unwrap();

        // File modes do not bind root
        let owner_check = temp_dir.path().join("owner-check");
        fs::write(&owner_check, "").unwrap();
        if fs::metadata(&owner_check).unwrap().uid() == 0 {
            return;
        }

        let parent = temp_dir.path().join("locked");
        fs::create_dir(&parent).unwrap();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o500)).unwrap();

        let store = ConfigStore::with_root(parent.join("vault"));
        let result = store.replace_bundle(&bundle("api1", &["url"]));

        fs::set_permissions(&parent, fs::Permissions::from_mode(0o700)).unwrap();
        assert!(
            matches!(
                result,
                Err(VaultError::PermissionDenied { ref path }) if path.starts_with(&parent)
            ),
            "got {:?}",
            result
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_loose_root_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("vault");
        fs::create_dir(&root).unwrap();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();

        ConfigStore::with_root(&root).ensure_root().unwrap();

        assert_eq!(fs::metadata(&root).unwrap().permissions().mode() & 0o777, 0o700);
    }
}
