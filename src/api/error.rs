//! API error types for the Tracker client.

use thiserror::Error;

/// Errors that can occur when interacting with the Tracker API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or no response was received.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The requested resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The service answered with an error status other than 404.
    #[error("Tracker returned HTTP {status}: {}", .message.as_deref().unwrap_or(.body))]
    Remote {
        /// The HTTP status code.
        status: u16,
        /// The error text extracted from the body, if it was a Tracker error object.
        message: Option<String>,
        /// The raw response body.
        body: String,
    },

    /// The response was successful but did not decode into the expected shape.
    #[error("Unexpected response shape: {0}")]
    Schema(String),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An argument was rejected before any request was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection validation failed.
    #[error("Connection validation failed: {0}")]
    ConnectionFailed(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Create an error from a non-success HTTP status.
    ///
    /// `context` names what was requested and becomes the `NotFound` message.
    pub fn from_status(status: reqwest::StatusCode, context: &str, body: &str) -> Self {
        match status.as_u16() {
            404 => ApiError::NotFound(context.to_string()),
            code => ApiError::Remote {
                status: code,
                message: extract_error_message(body),
                body: body.to_string(),
            },
        }
    }

    /// The HTTP status associated with this error, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound(_) => Some(404),
            ApiError::Remote { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the service rejected the API token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Remote { status: 401 | 403, .. })
    }

    /// Whether retrying the same call later might succeed.
    ///
    /// The client never retries on its own; this is a hint for callers.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) | ApiError::ConnectionFailed(_) => true,
            ApiError::Remote { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Pull the human-readable part out of a Tracker error object.
///
/// Tracker answers errors with `{"kind": "error", "code": .., "error": ..}`
/// and sometimes a `general_problem` with more detail.
fn extract_error_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let error = json.get("error").and_then(|v| v.as_str());
    let problem = json.get("general_problem").and_then(|v| v.as_str());

    match (error, problem) {
        (Some(e), Some(p)) => Some(format!("{}: {}", e, p)),
        (Some(e), None) => Some(e.to_string()),
        (None, Some(p)) => Some(p.to_string()),
        (None, None) => None,
    }
}
