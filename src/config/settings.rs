//! Client-wide settings.

use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;

/// Settings shared by every profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// The name of the default profile to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// The API root, with or without a trailing slash.
    pub base_url: String,
    /// Request timeout in seconds, handed to the transport. Unset means the
    /// transport default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// `User-Agent` override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_profile: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            user_agent: None,
        }
    }
}
