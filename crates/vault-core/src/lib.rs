//! # vault-core
//!
//! Core functionality for API Vault including:
//! - Principal-bound protection of secret values (OS keyring or passphrase)
//! - Per-configuration JSON bundles in a private per-user directory
//! - Config Writer and Config Reader with zeroize-on-clear plaintext

pub mod bundle;
pub mod crypto;
pub mod error;
pub mod principal;
pub mod protect;
pub mod reader;
pub mod settings;
pub mod storage;
pub mod store;
pub mod writer;
mod vault;

pub use bundle::{BundleFile, ConfigName, SecretBundle};
pub use crypto::{PlaintextSecret, ProtectedValue};
pub use error::{Result, VaultError};
pub use principal::Principal;
pub use protect::{Backend, KeyringProtector, PassphraseProtector, Protector};
pub use reader::{read_config, secret_names, Secrets};
pub use settings::{EmptyValuePolicy, Settings, SettingsManager};
pub use storage::{KeyStore, KeyringStore, MemoryKeyStore};
pub use store::{ConfigStore, ROOT_ENV};
pub use vault::{build_protector, Vault};
pub use writer::write_config;
