//! Subcommand bodies, kept apart from argument parsing so they can be tested

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context};
use tracing::{debug, info};
use vault_core::{
    secret_names, Backend, ConfigName, ConfigStore, EmptyValuePolicy, SettingsManager, Vault,
};
use zeroize::Zeroize;

use crate::prompt::prompt_secret;

/// Values typed at the prompt, zeroed when dropped on any path out of `write`
#[derive(Default)]
struct EnteredSecrets(BTreeMap<String, String>);

impl EnteredSecrets {
    fn wipe(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

impl Drop for EnteredSecrets {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// Prompt for each secret in turn and store the result under `name`
pub fn write<F>(
    vault: &Vault,
    name: &str,
    secret_names: &[String],
    mut read: F,
) -> anyhow::Result<PathBuf>
where
    F: FnMut(&str) -> io::Result<String>,
{
    // Fail on bad input before asking for anything
    ConfigName::new(name)?;
    for (i, secret_name) in secret_names.iter().enumerate() {
        if secret_names[..i].contains(secret_name) {
            bail!("secret '{}' was given more than once", secret_name);
        }
    }

    let settings = vault.settings();
    let mut entered = EnteredSecrets::default();
    for secret_name in secret_names {
        let value = prompt_secret(
            secret_name,
            settings.prompt_attempts,
            settings.empty_value_policy,
            &mut read,
        )?;
        entered.0.insert(secret_name.clone(), value);
    }

    Ok(vault.write_config(name, &entered.0)?)
}

/// Secret names of `name`, read without the protector
pub fn names(store: &ConfigStore, name: &str, out: &mut impl Write) -> anyhow::Result<()> {
    for secret_name in secret_names(store, name)? {
        writeln!(out, "{}", secret_name)?;
    }
    Ok(())
}

/// Print one plaintext value, for `$(api-vault get api1 key)` in scripts
pub fn get(vault: &Vault, name: &str, secret: &str, out: &mut impl Write) -> anyhow::Result<()> {
    let mut secrets = vault.read_config(name)?;
    let Some(value) = secrets.take(secret) else {
        bail!("configuration '{}' has no secret named '{}'", name, secret);
    };
    secrets.clear();

    writeln!(out, "{}", value.expose())?;
    Ok(())
}

pub fn list(store: &ConfigStore, out: &mut impl Write) -> anyhow::Result<()> {
    for name in store.list()? {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

pub fn remove(store: &ConfigStore, name: &str) -> anyhow::Result<()> {
    store.remove(&ConfigName::new(name)?)?;
    Ok(())
}

/// Changes requested on the `settings` command line
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub backend: Option<Backend>,
    pub empty_value_policy: Option<EmptyValuePolicy>,
    pub prompt_attempts: Option<u32>,
}

impl SettingsUpdate {
    fn is_empty(&self) -> bool {
        self.backend.is_none()
            && self.empty_value_policy.is_none()
            && self.prompt_attempts.is_none()
    }
}

/// Apply `update` to the stored settings, then print the result as JSON
pub fn settings(
    store: &ConfigStore,
    update: SettingsUpdate,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut manager = SettingsManager::new(&store.meta_dir());

    if !update.is_empty() {
        let settings = manager.get_mut();
        if let Some(backend) = update.backend {
            settings.backend = backend;
        }
        if let Some(policy) = update.empty_value_policy {
            settings.empty_value_policy = policy;
        }
        if let Some(attempts) = update.prompt_attempts {
            if attempts == 0 {
                bail!("prompt attempts must be at least 1");
            }
            settings.prompt_attempts = attempts;
        }

        store.ensure_meta_dir()?;
        manager.save()?;
        info!("Updated settings in {:?}", store.meta_dir());
    }

    writeln!(out, "{}", serde_json::to_string_pretty(manager.get())?)?;
    Ok(())
}

/// Run `command` with every secret of `name` in its environment.
///
/// Returns the child's exit code. The decrypted buffers are cleared once the
/// child exits. The copies held by [`Command`] for the child's environment
/// belong to the standard library and are freed without zeroing.
pub fn exec(vault: &Vault, name: &str, command: &[String]) -> anyhow::Result<i32> {
    let Some((program, args)) = command.split_first() else {
        bail!("no command given to run");
    };

    let mut secrets = vault.read_config(name)?;

    let mut child = Command::new(program);
    child.args(args);
    for (secret_name, value) in secrets.iter() {
        child.env(env_var_name(secret_name), value.expose());
    }

    debug!("Running {:?} with {} secret(s) from '{}'", program, secrets.len(), name);
    let status = child.status();
    secrets.clear();

    let status = status.with_context(|| format!("failed to run {}", program))?;
    info!("{} exited with {}", program, status);

    // Killed by a signal: report like a shell would
    Ok(status.code().unwrap_or(128))
}

/// `client.id` -> `CLIENT_ID`
pub fn env_var_name(secret_name: &str) -> String {
    secret_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
