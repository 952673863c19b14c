//! Config Writer: protect named values and persist them as one bundle

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::bundle::{BundleFile, ConfigName, SecretBundle};
use crate::error::{Result, VaultError};
use crate::principal::Principal;
use crate::protect::Protector;
use crate::settings::EmptyValuePolicy;
use crate::store::ConfigStore;

/// Protect `secrets` for `principal` and replace the bundle stored under `name`.
///
/// Every value is protected before anything on disk changes, so a failure
/// part-way leaves the previous bundle in place. Returns the bundle path.
pub fn write_config(
    store: &ConfigStore,
    protector: &dyn Protector,
    principal: &Principal,
    name: &str,
    secrets: &BTreeMap<String, String>,
    policy: EmptyValuePolicy,
) -> Result<PathBuf> {
    let name = ConfigName::new(name)?;

    if secrets.is_empty() {
        return Err(VaultError::EmptyInput(format!(
            "configuration '{}' needs at least one secret",
            name
        )));
    }

    let mut bundle = SecretBundle::new();
    for (secret_name, value) in secrets {
        if secret_name.trim().is_empty() {
            return Err(VaultError::EmptyInput(
                "secret names must not be empty".to_string(),
            ));
        }
        check_value(&name, secret_name, value, policy)?;

        let protected = protector.protect(value.as_bytes(), principal)?;
        debug!("Protected secret '{}' for {}", secret_name, principal);
        bundle.insert(secret_name.clone(), protected);
    }

    let file = BundleFile::new(name, protector.backend(), bundle);
    store.replace_bundle(&file)
}

fn check_value(
    name: &ConfigName,
    secret_name: &str,
    value: &str,
    policy: EmptyValuePolicy,
) -> Result<()> {
    if !value.is_empty() {
        return Ok(());
    }

    match policy {
        EmptyValuePolicy::Reject => Err(VaultError::EmptyInput(format!(
            "secret '{}' in configuration '{}' has an empty value",
            secret_name, name
        ))),
        EmptyValuePolicy::Warn => {
            warn!(
                "Storing empty value for secret '{}' in configuration '{}'",
                secret_name, name
            );
            Ok(())
        }
    }
}
