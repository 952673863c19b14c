//! In-process key store

use std::collections::HashMap;
use std::sync::Mutex;

use super::KeyStore;
use crate::crypto::MasterKey;
use crate::error::{Result, VaultError};

/// Key store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, MasterKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MasterKey>>> {
        self.keys
            .lock()
            .map_err(|_| VaultError::StorageError("Memory key store poisoned".to_string()))
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self, account: &str) -> Result<Option<MasterKey>> {
        Ok(self.lock()?.get(account).cloned())
    }

    fn store(&self, account: &str, key: &MasterKey) -> Result<()> {
        self.lock()?.insert(account.to_string(), key.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "In-Memory Key Store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load_per_account() {
        let store = MemoryKeyStore::new();
        assert!(store.load("alice@host").unwrap().is_none());

        let key = MasterKey::generate();
        store.store("alice@host", &key).unwrap();
        let loaded = store.load("alice@host").unwrap().unwrap();
        assert_eq!(loaded.as_bytes(), key.as_bytes());
        assert!(store.load("bob@host").unwrap().is_none());

        let replacement = MasterKey::generate();
        store.store("alice@host", &replacement).unwrap();
        let loaded = store.load("alice@host").unwrap().unwrap();
        assert_eq!(loaded.as_bytes(), replacement.as_bytes());
    }
}
