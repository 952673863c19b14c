//! Principal-bound protection primitives
//!
//! A [`Protector`] turns plaintext into a [`ProtectedValue`] that only the
//! same principal can turn back. Two implementations exist:
//! 1. [`KeyringProtector`] - random per-principal key held by the OS keyring
//! 2. [`PassphraseProtector`] - Argon2id key for hosts without a keyring

mod keyring;
mod passphrase;

pub use self::keyring::KeyringProtector;
pub use passphrase::PassphraseProtector;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::{PlaintextSecret, ProtectedValue};
use crate::error::{Result, VaultError};
use crate::principal::Principal;

/// Which protector produced a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Keyring,
    Passphrase,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyring => "keyring",
            Self::Passphrase => "passphrase",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "keyring" => Ok(Self::Keyring),
            "passphrase" => Ok(Self::Passphrase),
            other => Err(VaultError::StorageError(format!(
                "Unknown protection backend '{}': expected keyring or passphrase",
                other
            ))),
        }
    }
}

/// OS-style protect/unprotect pair bound to a principal.
///
/// `unprotect` reports a value sealed for another principal (or with another
/// key) as [`VaultError::DecryptionError`]; callers that know the config name
/// turn that into [`VaultError::UnauthorizedPrincipal`].
pub trait Protector: Send + Sync {
    fn backend(&self) -> Backend;

    fn protect(&self, plaintext: &[u8], principal: &Principal) -> Result<ProtectedValue>;

    fn unprotect(&self, value: &ProtectedValue, principal: &Principal) -> Result<PlaintextSecret>;
}

/// Wrap authenticated plaintext, refusing anything that is not UTF-8
pub(crate) fn into_plaintext(bytes: Vec<u8>) -> Result<PlaintextSecret> {
    PlaintextSecret::from_utf8(bytes).ok_or_else(|| VaultError::CorruptFormat {
        path: Default::default(),
        reason: "decrypted value is not valid UTF-8".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse_and_display() {
        assert_eq!("keyring".parse::<Backend>().unwrap(), Backend::Keyring);
        assert_eq!("Passphrase".parse::<Backend>().unwrap(), Backend::Passphrase);
        assert!("dpapi".parse::<Backend>().is_err());
        assert_eq!(Backend::Passphrase.to_string(), "passphrase");
        assert_eq!(serde_json::to_string(&Backend::Keyring).unwrap(), "\"keyring\"");
    }
}
