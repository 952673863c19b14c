//! AES-256-GCM authenticated encryption bound to associated data
//!
//! Serialized format: `{iv_hex}:{auth_tag_hex}:{ciphertext_hex}`
//! - IV: 12 bytes (96 bits), fresh per call
//! - Auth tag: 16 bytes (128 bits), covers ciphertext and associated data
//! - Ciphertext: variable length
//!
//! The associated data is never stored. Opening with different associated
//! data fails the tag check, which is how values are pinned to a principal.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::MasterKey;
use crate::error::{Result, VaultError};

/// Protected value with IV and auth tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtectedValue {
    /// Initialization vector (12 bytes for GCM)
    pub iv: [u8; 12],
    /// Authentication tag (16 bytes)
    pub auth_tag: [u8; 16],
    /// Encrypted ciphertext
    pub ciphertext: Vec<u8>,
}

impl std::fmt::Display for ProtectedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(self.iv),
            hex::encode(self.auth_tag),
            hex::encode(&self.ciphertext)
        )
    }
}

impl ProtectedValue {
    /// Parse from the format: `{iv_hex}:{auth_tag_hex}:{ciphertext_hex}`
    pub fn from_string(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(VaultError::DecryptionError(
                "Invalid protected value format: expected iv:tag:ciphertext".to_string(),
            ));
        }

        let iv_bytes = hex::decode(parts[0])
            .map_err(|e| VaultError::DecryptionError(format!("Invalid IV hex: {}", e)))?;
        let auth_tag_bytes = hex::decode(parts[1])
            .map_err(|e| VaultError::DecryptionError(format!("Invalid auth tag hex: {}", e)))?;
        let ciphertext = hex::decode(parts[2])
            .map_err(|e| VaultError::DecryptionError(format!("Invalid ciphertext hex: {}", e)))?;

        let iv: [u8; 12] = iv_bytes.as_slice().try_into().map_err(|_| {
            VaultError::DecryptionError(format!(
                "Invalid IV length: expected 12, got {}",
                iv_bytes.len()
            ))
        })?;
        let auth_tag: [u8; 16] = auth_tag_bytes.as_slice().try_into().map_err(|_| {
            VaultError::DecryptionError(format!(
                "Invalid auth tag length: expected 16, got {}",
                auth_tag_bytes.len()
            ))
        })?;

        Ok(Self {
            iv,
            auth_tag,
            ciphertext,
        })
    }
}

impl TryFrom<String> for ProtectedValue {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_string(&value)
    }
}

impl From<ProtectedValue> for String {
    fn from(value: ProtectedValue) -> Self {
        value.to_string()
    }
}

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it
pub fn seal(plaintext: &[u8], aad: &[u8], key: &MasterKey) -> Result<ProtectedValue> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::EncryptionError(e.to_string()))?;

    let mut iv = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    // aes-gcm appends the auth tag to the ciphertext
    let mut ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| VaultError::EncryptionError(e.to_string()))?;

    if ciphertext.len() < 16 {
        return Err(VaultError::EncryptionError(
            "Ciphertext too short".to_string(),
        ));
    }

    let tag_start = ciphertext.len() - 16;
    let mut auth_tag = [0u8; 16];
    auth_tag.copy_from_slice(&ciphertext[tag_start..]);
    ciphertext.truncate(tag_start);

    Ok(ProtectedValue {
        iv,
        auth_tag,
        ciphertext,
    })
}

/// Decrypt a protected value. Fails if the key or `aad` differ from sealing.
pub fn open(value: &ProtectedValue, aad: &[u8], key: &MasterKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::DecryptionError(e.to_string()))?;

    let nonce = Nonce::from_slice(&value.iv);

    let mut ciphertext_with_tag = Vec::with_capacity(value.ciphertext.len() + 16);
    ciphertext_with_tag.extend_from_slice(&value.ciphertext);
    ciphertext_with_tag.extend_from_slice(&value.auth_tag);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &ciphertext_with_tag,
                aad,
            },
        )
        .map_err(|_| VaultError::DecryptionError("authentication tag mismatch".to_string()))
}
