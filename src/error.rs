//! Crate-level error type.
//!
//! Aggregates configuration and API errors for entry points that touch both,
//! such as [`crate::connect`], and turns them into messages fit for end
//! users of an application built on this crate.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;

/// Any error this crate can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),
}

impl Error {
    /// Get a user-friendly message for display.
    ///
    /// This returns a message without technical detail; the `Display`
    /// output keeps the detail for logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::CreateDirError(_) => {
                    "Could not create configuration directory. Check file permissions.".to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file exists and is readable.".to_string()
                }
                ConfigError::WriteError(_) => {
                    "Could not save configuration. Please check file permissions.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::SerializeError(_) => {
                    "Could not save configuration. Internal error.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
                ConfigError::ProfileNotFound(name) => format!("Profile '{}' not found.", name),
            },
            Error::Api(e) => match e {
                ApiError::Transport(_) => {
                    "Connection failed. Please check your internet connection.".to_string()
                }
                ApiError::NotFound(resource) => format!("'{}' was not found.", resource),
                ApiError::Remote { .. } if e.is_unauthorized() => {
                    "Tracker rejected the request. Please check your API token and project access."
                        .to_string()
                }
                ApiError::Remote { status: 429, .. } => {
                    "Too many requests. Please wait a moment and try again.".to_string()
                }
                ApiError::Remote { status, message, .. } => match message {
                    Some(msg) => format!("Tracker error ({}): {}", status, msg),
                    None => format!("Tracker returned an error (HTTP {}).", status),
                },
                ApiError::Schema(_) => {
                    "Unexpected response from Tracker. Please try again.".to_string()
                }
                ApiError::InvalidUrl(_) => "Invalid Tracker URL in configuration.".to_string(),
                ApiError::InvalidInput(msg) => format!("Invalid input: {}", msg),
                ApiError::ConnectionFailed(_) => {
                    "Could not connect to Tracker. Please check your URL and network.".to_string()
                }
            },
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Recoverable errors can be retried, or the caller can carry on.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Api(ApiError::NotFound(_)) => true,
            Error::Api(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            Error::Config(ConfigError::NoConfigDir) | Error::Config(ConfigError::ReadError(_)) => {
                Some("Create a config.toml with at least one [[profiles]] entry.")
            }
            Error::Config(ConfigError::ProfileNotFound(_)) => {
                Some("Check the profile name or set settings.default_profile.")
            }
            Error::Api(e) if e.is_unauthorized() => {
                Some("Check your API token on your Tracker profile page.")
            }
            Error::Api(ApiError::Transport(_)) | Error::Api(ApiError::ConnectionFailed(_)) => {
                Some("Check your internet connection and Tracker URL.")
            }
            _ => None,
        }
    }
}

/// Result type for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;
