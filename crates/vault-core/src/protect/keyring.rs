//! Keyring-held per-principal keys

use std::sync::Mutex;

use tracing::{debug, info};

use super::{into_plaintext, Backend, Protector};
use crate::crypto::{open, seal, MasterKey, PlaintextSecret, ProtectedValue};
use crate::error::{Result, VaultError};
use crate::principal::Principal;
use crate::storage::{KeyStore, KeyringStore};

/// Protector whose key lives in a [`KeyStore`] under the principal's account.
///
/// The first `protect` for a principal creates its key. `unprotect` never
/// creates one, so a principal without a key cannot decrypt anything.
pub struct KeyringProtector<S: KeyStore = KeyringStore> {
    store: S,
    cached: Mutex<Option<(String, MasterKey)>>,
}

impl KeyringProtector<KeyringStore> {
    /// Protector backed by the OS keyring
    pub fn system() -> Self {
        Self::new(KeyringStore::new())
    }
}

impl<S: KeyStore> KeyringProtector<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn cached_key(&self, account: &str) -> Option<MasterKey> {
        let cached = self.cached.lock().ok()?;
        cached
            .as_ref()
            .filter(|(cached_account, _)| cached_account == account)
            .map(|(_, key)| key.clone())
    }

    fn remember(&self, account: &str, key: &MasterKey) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some((account.to_string(), key.clone()));
        }
    }

    fn existing_key(&self, principal: &Principal) -> Result<Option<MasterKey>> {
        let account = principal.account();
        if let Some(key) = self.cached_key(&account) {
            return Ok(Some(key));
        }

        let key = self.store.load(&account)?;
        if let Some(key) = &key {
            self.remember(&account, key);
        }
        Ok(key)
    }

    fn key_for_protect(&self, principal: &Principal) -> Result<MasterKey> {
        if let Some(key) = self.existing_key(principal)? {
            return Ok(key);
        }

        let account = principal.account();
        let key = MasterKey::generate();
        self.store.store(&account, &key)?;
        self.remember(&account, &key);

        info!(
            "Created protection key for {} in {}",
            account,
            self.store.backend_name()
        );
        Ok(key)
    }
}

impl<S: KeyStore> Protector for KeyringProtector<S> {
    fn backend(&self) -> Backend {
        Backend::Keyring
    }

    fn protect(&self, plaintext: &[u8], principal: &Principal) -> Result<ProtectedValue> {
        let key = self.key_for_protect(principal)?;
        seal(plaintext, &principal.fingerprint(), &key)
    }

    fn unprotect(&self, value: &ProtectedValue, principal: &Principal) -> Result<PlaintextSecret> {
        let key = self.existing_key(principal)?.ok_or_else(|| {
            debug!("No protection key for {}", principal);
            VaultError::DecryptionError(format!("no protection key exists for {}", principal))
        })?;

        let bytes = open(value, &principal.fingerprint(), &key)?;
        into_plaintext(bytes)
    }
}
