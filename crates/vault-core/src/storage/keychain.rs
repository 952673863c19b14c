//! OS keyring key store
//!
//! Uses the system keyring, which is already scoped to the logged-in user:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;
use tracing::debug;

use super::KeyStore;
use crate::crypto::MasterKey;
use crate::error::{Result, VaultError};

/// Service name used for keyring entries
const SERVICE_NAME: &str = "api-vault";

/// OS keyring key store
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, account: &str) -> Result<Entry> {
        Entry::new(&self.service, account).map_err(|e| VaultError::KeyringError(e.to_string()))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for KeyringStore {
    fn load(&self, account: &str) -> Result<Option<MasterKey>> {
        let entry = self.entry(account)?;

        match entry.get_password() {
            Ok(encoded) => {
                let key = MasterKey::from_hex(&encoded).ok_or_else(|| {
                    VaultError::KeyringError(format!(
                        "Keyring entry for {} does not hold a valid key",
                        account
                    ))
                })?;
                debug!("Loaded protection key from keyring for {}", account);
                Ok(Some(key))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No protection key in keyring for {}", account);
                Ok(None)
            }
            Err(e) => Err(VaultError::KeyringError(e.to_string())),
        }
    }

    fn store(&self, account: &str, key: &MasterKey) -> Result<()> {
        let entry = self.entry(account)?;
        let mut encoded = key.to_hex();
        let result = entry
            .set_password(&encoded)
            .map_err(|e| VaultError::KeyringError(e.to_string()));
        zeroize::Zeroize::zeroize(&mut encoded);
        result?;

        debug!("Stored protection key in keyring for {}", account);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        return "macOS Keychain";

        #[cfg(target_os = "windows")]
        return "Windows Credential Manager";

        #[cfg(target_os = "linux")]
        return "Linux Secret Service";

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        return "System Keyring";
    }
}
