//! Vault settings
//!
//! Stores non-sensitive configuration in a plain JSON file inside the
//! store's metadata directory. Missing files and fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, VaultError};
use crate::protect::Backend;

/// What the writer does with a secret whose value is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyValuePolicy {
    /// Fail with `EmptyInput`
    #[default]
    Reject,
    /// Log a warning and store the empty value
    Warn,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Protector used when none is given on the command line
    pub backend: Backend,
    /// Handling of empty secret values at write time
    pub empty_value_policy: EmptyValuePolicy,
    /// How many times an interactive prompt is repeated on empty input
    pub prompt_attempts: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            backend: Backend::Keyring,
            empty_value_policy: EmptyValuePolicy::Reject,
            prompt_attempts: 3,
        }
    }
}

/// Settings manager
#[derive(Debug)]
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Load settings from `dir/settings.json`, falling back to defaults
    pub fn new(dir: &Path) -> Self {
        let settings_file = dir.join("settings.json");
        let settings = Self::load_from_file(&settings_file).unwrap_or_else(|e| {
            warn!("Ignoring unreadable settings file {:?}: {}", settings_file, e);
            Settings::default()
        });

        Self {
            settings_file,
            settings,
        }
    }

    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        let temp_path = self.settings_file.with_extension("tmp");
        std::fs::write(&temp_path, &contents).map_err(|e| VaultError::io_at(e, &temp_path))?;
        std::fs::rename(&temp_path, &self.settings_file)
            .map_err(|e| VaultError::io_at(e, &self.settings_file))?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
