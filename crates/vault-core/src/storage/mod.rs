//! Key stores backing the keyring protector
//!
//! This module provides two stores:
//! 1. OS keyring (Keychain, Credential Manager, Secret Service)
//! 2. In-process memory (tests and embedding)

mod keychain;
mod memory;
mod traits;

pub use keychain::KeyringStore;
pub use memory::MemoryKeyStore;
pub use traits::KeyStore;
