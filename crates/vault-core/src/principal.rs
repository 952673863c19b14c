//! The (user account, host machine) pair that protected values are bound to

use std::fmt;

use tracing::debug;

use crate::error::{Result, VaultError};

/// Identity a protected value is pinned to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    user: String,
    host: String,
}

impl Principal {
    /// Build a principal from explicit parts. Host names compare case-insensitively.
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into().to_ascii_lowercase(),
        }
    }

    /// Resolve the principal of the running process
    pub fn current() -> Result<Self> {
        let from_env = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok();
        let user = resolve_user(from_env)?;

        let host = hostname::get()
            .map_err(|e| VaultError::StorageError(format!("Could not read host name: {}", e)))?
            .to_string_lossy()
            .into_owned();

        Ok(Self::new(user, host))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Keyring account name for this principal's protection key
    pub fn account(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Associated data mixed into every seal made for this principal
    pub fn fingerprint(&self) -> Vec<u8> {
        format!("api-vault:v1:{}@{}", self.user, self.host).into_bytes()
    }
}

/// Prefer the login name from the environment, else ask the OS account database
fn resolve_user(from_env: Option<String>) -> Result<String> {
    if let Some(user) = from_env.filter(|u| !u.is_empty()) {
        return Ok(user);
    }

    let user = whoami::fallible::username().map_err(|e| {
        VaultError::StorageError(format!("Could not determine the current user name: {}", e))
    })?;
    debug!("USER and USERNAME unset, using account name {}", user);
    Ok(user)
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.host)
    }
}
