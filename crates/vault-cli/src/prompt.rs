//! Masked interactive input

use std::io;

use vault_core::{EmptyValuePolicy, VaultError};

/// Ask for a secret value until a usable one is entered.
///
/// `read` receives the prompt text and returns the entered line. Under
/// [`EmptyValuePolicy::Reject`] empty input is re-asked up to `attempts`
/// times; under `Warn` it is accepted as-is.
pub fn prompt_secret<F>(
    secret_name: &str,
    attempts: u32,
    policy: EmptyValuePolicy,
    mut read: F,
) -> anyhow::Result<String>
where
    F: FnMut(&str) -> io::Result<String>,
{
    let prompt = format!("{}: ", secret_name);

    for attempt in 1..=attempts.max(1) {
        let value = read(&prompt)?;
        if !value.is_empty() || policy == EmptyValuePolicy::Warn {
            return Ok(value);
        }
        if attempt < attempts {
            eprintln!("Value for '{}' must not be empty, try again", secret_name);
        }
    }

    Err(VaultError::EmptyInput(format!(
        "no value entered for '{}' after {} attempt(s)",
        secret_name,
        attempts.max(1)
    ))
    .into())
}

/// Read without echo from the terminal
pub fn read_masked(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}
