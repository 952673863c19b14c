//! Config Reader: load a bundle and unprotect it into caller-owned plaintext

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::bundle::ConfigName;
use crate::crypto::PlaintextSecret;
use crate::error::{Result, VaultError};
use crate::principal::Principal;
use crate::protect::Protector;
use crate::store::ConfigStore;

/// Decrypted secrets of one configuration.
///
/// Each value is zeroed on [`Secrets::clear`], on [`PlaintextSecret::clear`],
/// and when it is dropped, so an early return or `?` never leaves plaintext
/// behind.
pub struct Secrets {
    name: ConfigName,
    values: BTreeMap<String, PlaintextSecret>,
}

impl Secrets {
    pub fn config_name(&self) -> &ConfigName {
        &self.name
    }

    pub fn get(&self, secret: &str) -> Option<&PlaintextSecret> {
        self.values.get(secret)
    }

    /// Shortcut for `get(secret).map(PlaintextSecret::expose)`
    pub fn expose(&self, secret: &str) -> Option<&str> {
        self.get(secret).map(PlaintextSecret::expose)
    }

    pub fn get_mut(&mut self, secret: &str) -> Option<&mut PlaintextSecret> {
        self.values.get_mut(secret)
    }

    /// Move one secret out, leaving the rest in place
    pub fn take(&mut self, secret: &str) -> Option<PlaintextSecret> {
        self.values.remove(secret)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlaintextSecret)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Zero every plaintext value. Names stay available.
    pub fn clear(&mut self) {
        for value in self.values.values_mut() {
            value.clear();
        }
        debug!("Cleared {} secret(s) of '{}'", self.values.len(), self.name);
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("name", &self.name)
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Load the bundle for `name` and unprotect every value for `principal`.
///
/// All or nothing: if any value fails, the ones already decrypted are
/// zeroed before the error is returned.
pub fn read_config(
    store: &ConfigStore,
    protector: &dyn Protector,
    principal: &Principal,
    name: &str,
) -> Result<Secrets> {
    let name = ConfigName::new(name)?;
    let file = store.load_bundle(&name)?;
    let path = store.bundle_path(&name);

    if file.backend != protector.backend() {
        warn!(
            "Configuration '{}' was written with the {} backend but is being read with {}",
            name,
            file.backend,
            protector.backend()
        );
    }

    let mut values = BTreeMap::new();
    for (secret_name, protected) in &file.secrets {
        let plaintext = protector
            .unprotect(protected, principal)
            .map_err(|e| classify(e, &name, principal, &path))?;
        values.insert(secret_name.clone(), plaintext);
    }

    debug!("Read {} secret(s) from '{}'", values.len(), name);
    Ok(Secrets { name, values })
}

/// Names stored under `name`, without decrypting anything
pub fn secret_names(store: &ConfigStore, name: &str) -> Result<Vec<String>> {
    let name = ConfigName::new(name)?;
    Ok(store.load_bundle(&name)?.secret_names())
}

fn classify(err: VaultError, name: &ConfigName, principal: &Principal, path: &Path) -> VaultError {
    match err {
        VaultError::DecryptionError(reason) => {
            debug!("Unprotect of '{}' failed: {}", name, reason);
            VaultError::UnauthorizedPrincipal {
                name: name.to_string(),
                principal: principal.to_string(),
            }
        }
        VaultError::CorruptFormat { reason, .. } => VaultError::CorruptFormat {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protect::KeyringProtector;
    use crate::settings::EmptyValuePolicy;
    use crate::storage::MemoryKeyStore;
    use crate::writer::write_config;
    use tempfile::TempDir;

    fn write_api1(store: &ConfigStore, protector: &dyn Protector, principal: &Principal) {
        let secrets: BTreeMap<String, String> = [
            ("url".to_string(), "https://website.com/api/v1".to_string()),
            ("key".to_string(), "siufj0a0s83hascn87cha98x=".to_string()),
        ]
        .into_iter()
        .collect();
        write_config(store, protector, principal, "api1", &secrets, EmptyValuePolicy::Reject)
            .unwrap();
    }

    #[test]
    fn test_read_returns_plaintext() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        let protector = KeyringProtector::new(MemoryKeyStore::new());
        let alice = Principal::new("alice", "host1");
        write_api1(&store, &protector, &alice);

        let secrets = read_config(&store, &protector, &alice, "api1").unwrap();

        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets.names().collect::<Vec<_>>(), vec!["key", "url"]);
        assert_eq!(secrets.expose("url"), Some("https://website.com/api/v1"));
        assert_eq!(secrets.expose("key"), Some("siufj0a0s83hascn87cha98x="));
        assert!(secrets.get("missing").is_none());
    }

    #[test]
    fn test_clear_zeroes_every_buffer() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        let protector = KeyringProtector::new(MemoryKeyStore::new());
        let alice = Principal::new("alice", "host1");
        write_api1(&store, &protector, &alice);

        let mut secrets = read_config(&store, &protector, &alice, "api1").unwrap();
        assert_eq!(
            secrets.get("key").unwrap().backing_bytes(),
            b"siufj0a0s83hascn87cha98x="
        );

        secrets.clear();

        for (_, value) in secrets.iter() {
            assert!(value.is_cleared());
            assert!(value.backing_bytes().iter().all(|b| *b == 0));
        }
        assert_eq!(secrets.names().count(), 2);
    }

    #[test]
    fn test_other_principal_is_unauthorized() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        let protector = KeyringProtector::new(MemoryKeyStore::new());
        write_api1(&store, &protector, &Principal::new("alice", "host1"));

        let bob = Principal::new("bob", "host1");
        let err = read_config(&store, &protector, &bob, "api1").unwrap_err();
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("bob@host1"));
    }

    #[test]
    fn test_missing_config_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        let protector = KeyringProtector::new(MemoryKeyStore::new());

        let result = read_config(&store, &protector, &Principal::new("alice", "h"), "nonexistent");
        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_secret_names_without_decrypting() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        let protector = KeyringProtector::new(MemoryKeyStore::new());
        write_api1(&store, &protector, &Principal::new("alice", "host1"));

        assert_eq!(secret_names(&store, "api1").unwrap(), vec!["key", "url"]);
    }

    #[test]
    fn test_debug_hides_values() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::with_root(temp_dir.path());
        let protector = KeyringProtector::new(MemoryKeyStore::new());
        let alice = Principal::new("alice", "host1");
        write_api1(&store, &protector, &alice);

        let secrets = read_config(&store, &protector, &alice, "api1").unwrap();
        let debug = format!("{:?}", secrets);
        assert!(debug.contains("url"));
        assert!(!debug.contains("website.com"));
    }
}
