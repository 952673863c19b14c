//! API Vault CLI - store API credentials protected for the current user and machine
//!
//! `api-vault write api1 -s url -s key` prompts for each value without echo
//! and writes `<root>/api1/api1.json`. Scripts then read the values back with
//! `api-vault get api1 key` or `api-vault exec api1 -- <command>`.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use vault_cli::commands::{self, SettingsUpdate};
use vault_cli::{logging, prompt};
use vault_core::{Backend, ConfigStore, EmptyValuePolicy, Vault, VaultError};

/// Environment variable consulted before prompting for the passphrase
const PASSPHRASE_ENV: &str = "API_VAULT_PASSPHRASE";

/// API Vault - per-user, per-machine storage for API credentials
#[derive(Parser, Debug)]
#[command(name = "api-vault")]
#[command(version)]
#[command(about = "Store API credentials protected for the current user and machine")]
struct Args {
    /// Storage root (defaults to the platform's local data directory)
    #[arg(long, env = "API_VAULT_HOME", global = true)]
    root: Option<PathBuf>,

    /// Protection backend (defaults to the one in settings.json)
    #[arg(long, env = "API_VAULT_BACKEND", value_enum, global = true)]
    backend: Option<BackendArg>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prompt for secrets and write them as configuration NAME
    Write {
        name: String,
        /// Secret name to prompt for (repeatable)
        #[arg(short = 's', long = "secret", required = true)]
        secrets: Vec<String>,
    },
    /// List the secret names stored in configuration NAME
    Names { name: String },
    /// Print one decrypted secret to stdout
    Get { name: String, secret: String },
    /// Run a command with the secrets of NAME exported as environment variables
    Exec {
        name: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// List stored configurations
    List,
    /// Delete configuration NAME
    Remove { name: String },
    /// Show the stored settings, changing any that are given
    Settings {
        /// Backend used when --backend is not given
        #[arg(long = "default-backend", value_enum)]
        default_backend: Option<BackendArg>,
        /// What `write` does with an empty value
        #[arg(long, value_enum)]
        empty_values: Option<EmptyValuesArg>,
        /// Prompts per secret before `write` gives up on empty input
        #[arg(long)]
        prompt_attempts: Option<u32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Keyring,
    Passphrase,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Keyring => Backend::Keyring,
            BackendArg::Passphrase => Backend::Passphrase,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EmptyValuesArg {
    Reject,
    Warn,
}

impl From<EmptyValuesArg> for EmptyValuePolicy {
    fn from(arg: EmptyValuesArg) -> Self {
        match arg {
            EmptyValuesArg::Reject => EmptyValuePolicy::Reject,
            EmptyValuesArg::Warn => EmptyValuePolicy::Warn,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let rust_log = std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(logging::env_filter(args.verbose, rust_log.as_deref()))
        .init();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            let vault_err = err.downcast_ref::<VaultError>();
            if let Some(hint) = vault_err.and_then(hint_for) {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(vault_err.map(exit_code_for).unwrap_or(1))
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let store = match args.root {
        Some(root) => ConfigStore::with_root(root),
        None => ConfigStore::new()?,
    };
    debug!("Using storage root {:?}", store.root());

    // Only commands that protect or unprotect values need the protector
    let backend = args.backend.map(Backend::from);
    let open = |store| Vault::open(store, backend, read_passphrase);

    match args.command {
        Commands::Write { name, secrets } => {
            let path = commands::write(&open(store)?, &name, &secrets, prompt::read_masked)?;
            println!("Wrote {}", path.display());
        }
        Commands::Names { name } => commands::names(&store, &name, &mut io::stdout().lock())?,
        Commands::Get { name, secret } => {
            commands::get(&open(store)?, &name, &secret, &mut io::stdout().lock())?
        }
        Commands::Exec { name, command } => {
            let code = commands::exec(&open(store)?, &name, &command)?;
            return Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)));
        }
        Commands::List => commands::list(&store, &mut io::stdout().lock())?,
        Commands::Remove { name } => {
            commands::remove(&store, &name)?;
            println!("Removed {}", name);
        }
        Commands::Settings {
            default_backend,
            empty_values,
            prompt_attempts,
        } => {
            let update = SettingsUpdate {
                backend: default_backend.map(Backend::from),
                empty_value_policy: empty_values.map(EmptyValuePolicy::from),
                prompt_attempts,
            };
            commands::settings(&store, update, &mut io::stdout().lock())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_passphrase() -> vault_core::Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        if !passphrase.is_empty() {
            return Ok(passphrase);
        }
    }

    let passphrase = prompt::read_masked("Vault passphrase: ")?;
    if passphrase.is_empty() {
        return Err(VaultError::EmptyInput("passphrase must not be empty".to_string()));
    }
    Ok(passphrase)
}

fn hint_for(err: &VaultError) -> Option<&'static str> {
    match err {
        VaultError::NotFound(_) => Some("run `api-vault list` to see the stored configurations"),
        VaultError::UnauthorizedPrincipal { .. } => Some(
            "values are bound to the user account and machine that wrote them; \
             run `api-vault write` again on this machine",
        ),
        VaultError::KeyringError(_) => Some(
            "no usable OS keyring; try `--backend passphrase` with API_VAULT_PASSPHRASE set",
        ),
        _ => None,
    }
}

fn exit_code_for(err: &VaultError) -> u8 {
    match err {
        VaultError::NotFound(_) => 2,
        VaultError::UnauthorizedPrincipal { .. } => 3,
        VaultError::CorruptFormat { .. } => 4,
        VaultError::PermissionDenied { .. } => 5,
        _ => 1,
    }
}
