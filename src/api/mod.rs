//! Tracker API client and types.
//!
//! This module provides the interface for communicating with the Tracker REST API.

mod auth;
mod client;
pub mod datetime;
pub mod error;
pub mod resource;
pub mod types;

pub use auth::{Auth, TOKEN_HEADER};
pub use client::{ClientBuilder, ClientContext, TrackerClient, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use resource::{ProjectResource, Resource};
pub use types::{
    Comment, NewStory, Pagination, Project, Story, StoryPage, StoryType, StoryUpdate,
};
