//! Secure memory handling with automatic zeroization

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Principal protection key - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; 32],
}

impl MasterKey {
    /// Create a new master key from raw bytes
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Generate a fresh random key from the OS RNG
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Get the key bytes (use carefully - avoid copying)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Create from a slice (must be exactly 32 bytes)
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(slice);
        Some(Self { key })
    }

    /// Hex form used when the key is parked in a keyring entry
    pub(crate) fn to_hex(&self) -> String {
        hex::encode(self.key)
    }

    pub(crate) fn from_hex(encoded: &str) -> Option<Self> {
        let mut bytes = hex::decode(encoded.trim()).ok()?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }
}

impl Clone for MasterKey {
    fn clone(&self) -> Self {
        Self { key: self.key }
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Decrypted secret value owned by the caller.
///
/// The backing buffer never grows or moves after construction, so
/// [`PlaintextSecret::clear`] and the drop glue overwrite the only copy.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PlaintextSecret {
    bytes: Box<[u8]>,
    #[zeroize(skip)]
    cleared: bool,
}

impl PlaintextSecret {
    /// Take ownership of a secret string
    pub fn new(value: String) -> Self {
        Self::from_utf8(value.into_bytes()).unwrap_or_else(|| Self {
            bytes: Box::default(),
            cleared: false,
        })
    }

    /// Copy decrypted bytes into a fixed buffer and wipe the source.
    ///
    /// Returns `None` if the bytes are not UTF-8.
    pub fn from_utf8(mut bytes: Vec<u8>) -> Option<Self> {
        let secret = std::str::from_utf8(&bytes).ok().map(|_| Self {
            bytes: bytes.as_slice().into(),
            cleared: false,
        });
        bytes.zeroize();
        secret
    }

    /// Get the secret value (use carefully). Empty once cleared.
    pub fn expose(&self) -> &str {
        if self.cleared {
            return "";
        }
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.expose().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite the plaintext with zeros. Idempotent.
    pub fn clear(&mut self) {
        self.bytes.zeroize();
        self.cleared = true;
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    #[cfg(test)]
    pub(crate) fn backing_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for PlaintextSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaintextSecret")
            .field("value", &"[REDACTED]")
            .field("cleared", &self.cleared)
            .finish()
    }
}
