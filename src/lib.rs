//! tracker-client - a synchronous client for the Pivotal Tracker REST API.
//!
//! A [`TrackerClient`] is bound to one project and one API token. Each call
//! performs a single blocking request and hands back typed, read-only
//! resources such as [`Story`], or an [`ApiError`] that tells "missing"
//! apart from "broken".
//!
//! ```no_run
//! use tracker_client::TrackerClient;
//!
//! let client = TrackerClient::new(42, "your-api-token")?;
//! for story in client.get_stories(Some("state:unstarted"))? {
//!     println!("{}", story);
//! }
//! # Ok::<(), tracker_client::ApiError>(())
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod logging;

use tracing::debug;

pub use api::{
    ApiError, Comment, NewStory, Project, ProjectResource, Resource, Story, StoryPage, StoryType,
    StoryUpdate, TrackerClient,
};
pub use config::{Config, Profile, Settings};
pub use error::{Error, Result};

/// Build a client from a configuration profile.
///
/// Uses the named profile, or the config's default profile when `profile`
/// is `None`. The token is supplied by the caller; it is never read from
/// the configuration.
pub fn connect(config: &Config, profile: Option<&str>, token: &str) -> Result<TrackerClient> {
    let profile = match profile {
        Some(name) => config.profile(name)?,
        None => config.default_profile()?,
    };
    debug!(profile = %profile.name, project_id = profile.project_id, "Connecting");

    Ok(TrackerClient::from_profile(profile, &config.settings, token)?)
}
