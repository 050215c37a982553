//! Tracker profile configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};

/// A Tracker profile configuration.
///
/// Profiles name a project and, optionally, a non-default API root.
/// API tokens are never stored here; the caller supplies them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// The name of this profile.
    ///
    /// Must be non-empty and unique across all profiles.
    pub name: String,

    /// The Tracker project ID.
    pub project_id: u64,

    /// Overrides the API root from the settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Profile {
    /// Create a new profile using the default API root.
    pub fn new(name: String, project_id: u64) -> Self {
        Self {
            name,
            project_id,
            base_url: None,
        }
    }

    /// Validate this profile.
    ///
    /// Checks that:
    /// - The name is non-empty and has no whitespace
    /// - The project ID is positive
    /// - The base URL, if set, is an http(s) URL
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "profile name cannot be empty".to_string(),
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile name '{}' cannot contain whitespace",
                self.name
            )));
        }

        if self.project_id == 0 {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': project_id must be a positive integer",
                self.name
            )));
        }

        if let Some(url) = &self.base_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ConfigError::ValidationError(format!(
                    "profile '{}': base_url must start with http:// or https://",
                    self.name
                )));
            }
        }

        Ok(())
    }
}
