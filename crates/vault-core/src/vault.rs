//! Vault facade tying store, protector, principal and settings together
//!
//! Listing, removal and secret names need no protector and go through
//! [`ConfigStore`] and [`reader::secret_names`] directly.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};
use zeroize::Zeroize;

use crate::error::Result;
use crate::principal::Principal;
use crate::protect::{Backend, KeyringProtector, PassphraseProtector, Protector};
use crate::reader::{self, Secrets};
use crate::settings::{Settings, SettingsManager};
use crate::store::ConfigStore;
use crate::writer;

/// Main vault handle
pub struct Vault {
    store: ConfigStore,
    protector: Box<dyn Protector>,
    principal: Principal,
    settings: SettingsManager,
}

impl Vault {
    /// Create a vault over `store`, reading settings from its metadata directory
    pub fn new(store: ConfigStore, protector: Box<dyn Protector>, principal: Principal) -> Self {
        let settings = SettingsManager::new(&store.meta_dir());
        Self::with_settings(store, protector, principal, settings)
    }

    fn with_settings(
        store: ConfigStore,
        protector: Box<dyn Protector>,
        principal: Principal,
        settings: SettingsManager,
    ) -> Self {
        debug!(
            "Vault at {:?} using {} backend for {}",
            store.root(),
            protector.backend(),
            principal
        );

        Self {
            store,
            protector,
            principal,
            settings,
        }
    }

    /// Open the vault for the current user and machine.
    ///
    /// `backend` overrides the configured one. `passphrase` is only called
    /// when the passphrase backend is selected.
    pub fn open<F>(store: ConfigStore, backend: Option<Backend>, passphrase: F) -> Result<Self>
    where
        F: FnOnce() -> Result<String>,
    {
        let principal = Principal::current()?;
        let settings = SettingsManager::new(&store.meta_dir());
        let backend = backend.unwrap_or(settings.get().backend);

        let protector = build_protector(backend, &store, passphrase)?;
        Ok(Self::with_settings(store, protector, principal, settings))
    }

    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    /// Protect and persist `secrets` under `name`, replacing any previous bundle
    pub fn write_config(&self, name: &str, secrets: &BTreeMap<String, String>) -> Result<PathBuf> {
        writer::write_config(
            &self.store,
            self.protector.as_ref(),
            &self.principal,
            name,
            secrets,
            self.settings.get().empty_value_policy,
        )
    }

    /// Decrypt every secret stored under `name`
    pub fn read_config(&self, name: &str) -> Result<Secrets> {
        reader::read_config(&self.store, self.protector.as_ref(), &self.principal, name)
    }
}

/// Build the protector for `backend`
pub fn build_protector<F>(
    backend: Backend,
    store: &ConfigStore,
    passphrase: F,
) -> Result<Box<dyn Protector>>
where
    F: FnOnce() -> Result<String>,
{
    match backend {
        Backend::Keyring => Ok(Box::new(KeyringProtector::system())),
        Backend::Passphrase => {
            let salt = store.load_or_create_salt()?;
            let mut passphrase = passphrase()?;
            let protector = PassphraseProtector::new(&passphrase, &salt);
            passphrase.zeroize();

            info!("Using passphrase-derived protection key");
            Ok(Box::new(protector?))
        }
    }
}
