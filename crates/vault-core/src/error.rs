//! Error types for vault-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Invalid configuration name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Permission denied: {} is not accessible by the current user", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("No configuration named '{0}' exists")]
    NotFound(String),

    #[error("Configuration file {} is corrupt: {reason}", .path.display())]
    CorruptFormat { path: PathBuf, reason: String },

    #[error(
        "Configuration '{name}' cannot be decrypted by {principal}: \
         it was protected by a different user or machine"
    )]
    UnauthorizedPrincipal { name: String, principal: String },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Keyring error: {0}")]
    KeyringError(String),

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Decryption failed: {0}")]
    DecryptionError(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl VaultError {
    /// Map an IO error on `path`, keeping permission failures distinct
    pub(crate) fn io_at(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path: path.into() },
            _ => Self::IoError(err),
        }
    }

    /// Whether this error means the bundle exists but belongs to another principal
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::UnauthorizedPrincipal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_and_unauthorized_read_differently() {
        let missing = VaultError::NotFound("api1".to_string()).to_string();
        let foreign = VaultError::UnauthorizedPrincipal {
            name: "api1".to_string(),
            principal: "bob@host".to_string(),
        }
        .to_string();

        assert!(missing.contains("No configuration named 'api1'"));
        assert!(foreign.contains("different user or machine"));
        assert!(foreign.contains("bob@host"));
    }

    #[test]
    fn test_io_permission_denied_maps_to_variant() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let mapped = VaultError::io_at(err, "/tmp/x");
        assert!(matches!(mapped, VaultError::PermissionDenied { .. }));

        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(matches!(VaultError::io_at(err, "/tmp/x"), VaultError::IoError(_)));
    }
}
