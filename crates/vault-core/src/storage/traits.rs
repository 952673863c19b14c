//! Key store trait definitions

use crate::crypto::MasterKey;
use crate::error::Result;

/// Backend that holds one protection key per principal account
pub trait KeyStore: Send + Sync {
    /// Load the key for `account`, if one was ever stored
    fn load(&self, account: &str) -> Result<Option<MasterKey>>;

    /// Store (or replace) the key for `account`
    fn store(&self, account: &str, key: &MasterKey) -> Result<()>;

    /// Get a human-readable name for this backend
    fn backend_name(&self) -> &'static str;
}
