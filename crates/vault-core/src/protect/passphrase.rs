//! Passphrase-derived keys for hosts without a usable keyring

use super::{into_plaintext, Backend, Protector};
use crate::crypto::{
    derive_key, open, seal, KeyDerivationParams, MasterKey, PlaintextSecret, ProtectedValue,
};
use crate::error::Result;
use crate::principal::Principal;

/// Protector keyed by Argon2id over an operator passphrase and a per-root salt.
///
/// The principal is still bound through the associated data, so the same
/// passphrase on another account or machine does not open the values.
pub struct PassphraseProtector {
    key: MasterKey,
}

impl PassphraseProtector {
    pub fn new(passphrase: &str, salt: &str) -> Result<Self> {
        Self::with_params(passphrase, salt, None)
    }

    pub fn with_params(
        passphrase: &str,
        salt: &str,
        params: Option<KeyDerivationParams>,
    ) -> Result<Self> {
        Ok(Self {
            key: derive_key(passphrase, salt, params)?,
        })
    }
}

impl std::fmt::Debug for PassphraseProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassphraseProtector").finish_non_exhaustive()
    }
}

impl Protector for PassphraseProtector {
    fn backend(&self) -> Backend {
        Backend::Passphrase
    }

    fn protect(&self, plaintext: &[u8], principal: &Principal) -> Result<ProtectedValue> {
        seal(plaintext, &principal.fingerprint(), &self.key)
    }

    fn unprotect(&self, value: &ProtectedValue, principal: &Principal) -> Result<PlaintextSecret> {
        let bytes = open(value, &principal.fingerprint(), &self.key)?;
        into_plaintext(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_salt;
    use crate::error::VaultError;

    fn fast() -> Option<KeyDerivationParams> {
        Some(KeyDerivationParams {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn test_roundtrip_and_wrong_passphrase() {
        let salt = generate_salt();
        let alice = Principal::new("alice", "ci-runner");

        let protector = PassphraseProtector::with_params("correct horse", &salt, fast()).unwrap();
        let protected = protector.protect(b"https://website.com/api/v1", &alice).unwrap();
        assert_eq!(
            protector.unprotect(&protected, &alice).unwrap().expose(),
            "https://website.com/api/v1"
        );

        let wrong = PassphraseProtector::with_params("battery staple", &salt, fast()).unwrap();
        assert!(matches!(
            wrong.unprotect(&protected, &alice),
            Err(VaultError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_same_passphrase_other_machine_fails() {
        let salt = generate_salt();
        let protector = PassphraseProtector::with_params("correct horse", &salt, fast()).unwrap();

        let protected = protector
            .protect(b"secret", &Principal::new("alice", "laptop"))
            .unwrap();
        let result = protector.unprotect(&protected, &Principal::new("alice", "desktop"));

        assert!(matches!(result, Err(VaultError::DecryptionError(_))));
    }
}
