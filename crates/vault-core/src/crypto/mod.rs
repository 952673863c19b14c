//! Cryptographic primitives for principal-bound secret protection
//!
//! This module provides:
//! - AES-256-GCM sealing with associated data
//! - Argon2id key derivation from passphrases
//! - Zeroizing containers for keys and plaintext

mod encryption;
mod key_derivation;
mod secure_memory;

pub use encryption::{open, seal, ProtectedValue};
pub use key_derivation::{derive_key, generate_salt, KeyDerivationParams};
pub use secure_memory::{MasterKey, PlaintextSecret};
