//! Authentication handling for the Tracker API.
//!
//! Tracker authenticates API calls with a per-user token sent in the
//! `X-TrackerToken` header. Acquiring and storing that token is the caller's
//! business; this module only carries it and keeps it out of debug output.

use std::fmt;

/// The header Tracker reads the API token from.
pub const TOKEN_HEADER: &str = "X-TrackerToken";

/// Authentication credentials for Tracker.
#[derive(Clone)]
pub struct Auth {
    /// The raw API token.
    token: String,
}

impl Auth {
    /// Create new authentication credentials from an API token.
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }

    /// Get the header value to send, if there is a token to send.
    ///
    /// An empty token means the request goes out unauthenticated.
    pub fn header_value(&self) -> Option<&str> {
        if self.token.is_empty() {
            None
        } else {
            Some(&self.token)
        }
    }

    /// Check whether a token was supplied at all.
    pub fn is_anonymous(&self) -> bool {
        self.token.is_empty()
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.is_anonymous() { "<none>" } else { "<redacted>" };
        f.debug_struct("Auth").field("token", &token).finish()
    }
}
