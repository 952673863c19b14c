//! Config names and the persisted bundle format

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::ProtectedValue;
use crate::error::{Result, VaultError};
use crate::protect::Backend;

/// Current on-disk bundle version
pub const BUNDLE_VERSION: u32 = 1;

const MAX_NAME_LEN: usize = 64;

/// Operator-chosen identifier that doubles as a single path segment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigName(String);

impl ConfigName {
    pub fn new(name: &str) -> Result<Self> {
        let invalid = |reason: &str| VaultError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid("name must be at most 64 characters"));
        }
        if name.starts_with('.') {
            return Err(invalid("name must not start with '.'"));
        }
        // Windows drops a trailing dot, so "api." would land in "api"
        if name.ends_with('.') {
            return Err(invalid("name must not end with '.'"));
        }
        if let Some(c) = name.chars().find(|c| {
            !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
        }) {
            return Err(invalid(&format!(
                "character {:?} is not allowed (use lower-case letters, digits, '-', '_' or '.')",
                c
            )));
        }
        let stem = name.split('.').next().unwrap_or(name);
        if is_reserved_device_name(stem) {
            return Err(invalid("name is reserved by the Windows file system"));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the bundle inside the config directory
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

/// `con`, `nul`, `com1` and friends open devices on Windows, even with an extension
fn is_reserved_device_name(stem: &str) -> bool {
    match stem {
        "con" | "prn" | "aux" | "nul" => true,
        _ => {
            let numbered = stem.strip_prefix("com").or_else(|| stem.strip_prefix("lpt"));
            matches!(numbered, Some(n) if n.len() == 1 && matches!(n.as_bytes()[0], b'1'..=b'9'))
        }
    }
}

impl fmt::Display for ConfigName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConfigName {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ConfigName {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<ConfigName> for String {
    fn from(name: ConfigName) -> Self {
        name.0
    }
}

/// Secret name to protected value, kept in key order
pub type SecretBundle = BTreeMap<String, ProtectedValue>;

/// On-disk document for one configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleFile {
    pub version: u32,
    pub name: ConfigName,
    pub backend: Backend,
    pub created_at: DateTime<Utc>,
    pub secrets: SecretBundle,
}

impl BundleFile {
    pub fn new(name: ConfigName, backend: Backend, secrets: SecretBundle) -> Self {
        Self {
            version: BUNDLE_VERSION,
            name,
            backend,
            created_at: Utc::now(),
            secrets,
        }
    }

    /// Names of the secrets in this bundle, in key order
    pub fn secret_names(&self) -> Vec<String> {
        self.secrets.keys().cloned().collect()
    }
}
