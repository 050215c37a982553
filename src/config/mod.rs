//! Configuration management for tracker-client.
//!
//! This module handles loading, saving, and validating the configuration
//! file: client-wide settings plus named profiles, each bound to a project.

mod profile;
mod settings;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use profile::Profile;
pub use settings::Settings;

/// Directory name under the platform config directory.
const CONFIG_DIR_NAME: &str = "tracker-client";

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur while handling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// The config directory could not be created.
    #[error("Failed to create configuration directory: {0}")]
    CreateDirError(#[source] std::io::Error),

    /// The config file could not be read.
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[source] std::io::Error),

    /// The config file could not be written.
    #[error("Failed to write configuration file: {0}")]
    WriteError(#[source] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// The configuration is well-formed but inconsistent.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// No profile with the requested name.
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The full configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Client-wide settings.
    #[serde(default)]
    pub settings: Settings,
    /// Named profiles.
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Config {
    /// Get the default configuration file path.
    ///
    /// - Linux: `~/.config/tracker-client/config.toml`
    /// - macOS: `~/Library/Application Support/tracker-client/config.toml`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\tracker-client\config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the configuration from the default path.
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate the configuration from a file.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;

        info!(profiles = config.profiles.len(), "Configuration loaded");
        Ok(config)
    }

    /// Save the configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Validate and write the configuration to a file, creating parent
    /// directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(ConfigError::WriteError)?;

        debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Validate every profile and the references between them.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for profile in &self.profiles {
            profile.validate()?;
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        if let Some(default) = &self.settings.default_profile {
            if !seen.contains(default.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "default profile '{}' is not defined",
                    default
                )));
            }
        }

        Ok(())
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }

    /// Get the default profile.
    ///
    /// That is the one named by `settings.default_profile`, or the only
    /// profile when there is exactly one.
    pub fn default_profile(&self) -> Result<&Profile> {
        match (&self.settings.default_profile, self.profiles.as_slice()) {
            (Some(name), _) => self.profile(name),
            (None, [only]) => Ok(only),
            (None, _) => Err(ConfigError::ProfileNotFound("<default>".to_string())),
        }
    }
}
