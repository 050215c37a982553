//! Tracker API client implementation.
//!
//! This module provides the main client for interacting with the Tracker REST
//! API v5. Every call is a single blocking round trip scoped to the project
//! the client was built for: no caching, no retries, no background work.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{self, HeaderMap};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::auth::{Auth, TOKEN_HEADER};
use super::error::{ApiError, Result};
use super::resource::{self, ProjectResource, Resource};
use super::types::{Comment, NewComment, NewStory, Pagination, Project, Story, StoryPage, StoryUpdate};
use crate::config::{Profile, Settings};

/// The public Tracker API v5 endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.pivotaltracker.com/services/v5/";

/// User agent sent when none is configured.
const DEFAULT_USER_AGENT: &str = concat!("tracker-client/", env!("CARGO_PKG_VERSION"));

/// The filter Tracker uses to select release stories.
const RELEASE_FILTER: &str = "type:release";

const PAGINATION_TOTAL: &str = "x-tracker-pagination-total";
const PAGINATION_OFFSET: &str = "x-tracker-pagination-offset";
const PAGINATION_LIMIT: &str = "x-tracker-pagination-limit";
const PAGINATION_RETURNED: &str = "x-tracker-pagination-returned";

/// The fixed identity every request is scoped and authenticated with.
#[derive(Debug, Clone)]
pub struct ClientContext {
    project_id: u64,
    auth: Auth,
}

impl ClientContext {
    /// Create a context for a project and API token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` if `project_id` is zero.
    pub fn new(project_id: u64, token: &str) -> Result<Self> {
        if project_id == 0 {
            return Err(ApiError::InvalidInput(
                "project id must be a positive integer".to_string(),
            ));
        }

        Ok(Self {
            project_id,
            auth: Auth::new(token),
        })
    }

    /// The project every request is scoped to.
    pub fn project_id(&self) -> u64 {
        self.project_id
    }
}

/// Builder for a [`TrackerClient`] with non-default transport settings.
#[derive(Debug)]
pub struct ClientBuilder {
    project_id: u64,
    token: String,
    base_url: String,
    timeout: Option<Duration>,
    user_agent: String,
}

impl ClientBuilder {
    fn new(project_id: u64, token: &str) -> Self {
        Self {
            project_id,
            token: token.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Use a different API root (e.g. a test server). Must be http(s).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Hand a request timeout to the transport.
    ///
    /// Without one, the transport's own default applies.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The project id is zero
    /// - The base URL is not an http(s) URL
    /// - The HTTP client cannot be built
    pub fn build(self) -> Result<TrackerClient> {
        let context = ClientContext::new(self.project_id, &self.token)?;
        let base_url = normalize_base_url(&self.base_url)?;

        let mut builder = Client::builder().user_agent(self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ApiError::Transport)?;

        if context.auth.is_anonymous() {
            warn!("No API token supplied; requests will be unauthenticated");
        }

        Ok(TrackerClient {
            client,
            base_url,
            context,
        })
    }
}

/// The Tracker API client.
///
/// Holds an immutable [`ClientContext`] and the transport. It has no
/// interior mutability, so one client can be shared by reference between
/// threads; each call is independent.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    /// The HTTP client.
    client: Client,
    /// The API root, always ending in `/`.
    base_url: String,
    /// Project and credentials.
    context: ClientContext,
}

impl TrackerClient {
    /// Create a client for the public Tracker API.
    ///
    /// # Errors
    ///
    /// Returns an error if the project id is zero or the HTTP client cannot
    /// be built.
    pub fn new(project_id: u64, token: &str) -> Result<Self> {
        Self::builder(project_id, token).build()
    }

    /// Start building a client with custom transport settings.
    pub fn builder(project_id: u64, token: &str) -> ClientBuilder {
        ClientBuilder::new(project_id, token)
    }

    /// Create a client from a configured profile.
    ///
    /// The profile's base URL wins over the one in `settings`.
    #[instrument(skip(profile, settings, token), fields(profile_name = %profile.name))]
    pub fn from_profile(profile: &Profile, settings: &Settings, token: &str) -> Result<Self> {
        info!("Creating Tracker client for profile");

        let mut builder = Self::builder(profile.project_id, token).base_url(
            profile
                .base_url
                .clone()
                .unwrap_or_else(|| settings.base_url.clone()),
        );
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(agent) = &settings.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        builder.build()
    }

    /// The project this client is scoped to.
    pub fn project_id(&self) -> u64 {
        self.context.project_id
    }

    /// The project and credentials every request carries.
    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validate the connection by fetching the project.
    ///
    /// This verifies that the URL is reachable, the token is accepted and the
    /// project exists.
    #[instrument(skip(self), fields(project_id = self.context.project_id))]
    pub fn validate_connection(&self) -> Result<Project> {
        debug!("Validating Tracker connection");

        let project = self.get_project().map_err(|e| {
            error!("Connection validation failed: {}", e);
            match e {
                ApiError::Transport(_) => {
                    ApiError::ConnectionFailed(format!("Cannot connect to {}: {}", self.base_url, e))
                }
                other => other,
            }
        })?;

        info!(
            "Connected to project: {}",
            project.name().unwrap_or("<unnamed>")
        );
        Ok(project)
    }

    /// Get the project this client is scoped to.
    ///
    /// Calls `GET /projects/{project_id}`.
    #[instrument(skip(self), fields(project_id = self.context.project_id))]
    pub fn get_project(&self) -> Result<Project> {
        let url = self.project_url("");
        let context = format!("project {}", self.context.project_id);
        let body = self.fetch(Method::GET, &url, &context)?;
        resource::decode(&body)
    }

    /// Get a single resource by id.
    ///
    /// Calls `GET /projects/{project_id}/{collection}/{id}`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `id` is zero (no request is sent)
    /// - `NotFound` if the service reports 404
    /// - `Remote` for any other error status
    /// - `Transport` if no response was obtained
    /// - `Schema` if the body does not decode
    #[instrument(skip(self), fields(project_id = self.context.project_id, kind = R::KIND))]
    pub fn get_resource<R: ProjectResource>(&self, id: u64) -> Result<R> {
        check_id(R::KIND, id)?;
        debug!("Fetching resource");

        let url = self.project_url(&format!("{}/{}", R::COLLECTION, id));
        let context = format!("{} {}", R::KIND, id);
        let body = self.fetch(Method::GET, &url, &context)?;
        let resource: R = resource::decode(&body)?;

        debug!("Fetched {}", resource.to_display_string());
        Ok(resource)
    }

    /// List the resources of a collection, optionally narrowed by a filter.
    ///
    /// Calls `GET /projects/{project_id}/{collection}?filter=...`. The filter
    /// is passed through as-is in Tracker's search syntax; an empty filter
    /// is the same as none. The result keeps the service's ordering and
    /// covers only the first page the service returns.
    #[instrument(skip(self), fields(project_id = self.context.project_id, kind = R::KIND))]
    pub fn list_resources<R: ProjectResource>(&self, filter: Option<&str>) -> Result<Vec<R>> {
        let url = self.collection_url(R::COLLECTION, filter, &[]);
        let body = self.fetch(Method::GET, &url, &self.collection_context(R::COLLECTION))?;
        let resources: Vec<R> = resource::decode_list(&body)?;

        debug!("Found {} {} resources", resources.len(), R::KIND);
        Ok(resources)
    }

    /// Get a single story by id.
    pub fn get_story(&self, story_id: u64) -> Result<Story> {
        self.get_resource(story_id)
    }

    /// Fetch all stories that match the filter.
    ///
    /// # Arguments
    ///
    /// * `filter` - A Tracker search filter such as `"state:unstarted"`
    pub fn get_stories(&self, filter: Option<&str>) -> Result<Vec<Story>> {
        self.list_resources(filter)
    }

    /// Fetch the release stories of the project.
    pub fn get_release_stories(&self) -> Result<Vec<Story>> {
        self.get_stories(Some(RELEASE_FILTER))
    }

    /// Fetch one page of stories.
    ///
    /// # Arguments
    ///
    /// * `filter` - Optional Tracker search filter
    /// * `offset` - The index of the first story to return (0-based)
    /// * `limit` - Maximum number of stories to return
    ///
    /// # Returns
    ///
    /// A `StoryPage` with the stories and whatever pagination metadata the
    /// service sent. Pages are never aggregated.
    #[instrument(skip(self), fields(project_id = self.context.project_id))]
    pub fn get_stories_page(
        &self,
        filter: Option<&str>,
        offset: u32,
        limit: u32,
    ) -> Result<StoryPage> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("page limit must be positive".to_string()));
        }
        debug!("Fetching stories page: offset={}, limit={}", offset, limit);

        let url = self.collection_url(
            Story::COLLECTION,
            filter,
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
        );
        let response = self.send(
            self.request(Method::GET, &url),
            &self.collection_context(Story::COLLECTION),
        )?;
        let pagination = parse_pagination(response.headers());
        let body = response.text()?;
        let stories: Vec<Story> = resource::decode_list(&body)?;

        debug!(
            "Found {} stories (total: {:?})",
            stories.len(),
            pagination.map(|p| p.total)
        );
        Ok(StoryPage { stories, pagination })
    }

    /// Create a story and return it as stored by Tracker.
    ///
    /// Calls `POST /projects/{project_id}/stories`.
    #[instrument(skip(self, story), fields(project_id = self.context.project_id))]
    pub fn create_story(&self, story: &NewStory) -> Result<Story> {
        if story.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("story name cannot be empty".to_string()));
        }
        info!("Creating story");

        let url = self.project_url(Story::COLLECTION);
        let body = self.fetch_with_body(Method::POST, &url, "new story", story)?;
        let created: Story = resource::decode(&body)?;

        info!("Created story {}", created.id());
        Ok(created)
    }

    /// Apply an update to an existing story and return the updated story.
    ///
    /// Calls `PUT /projects/{project_id}/stories/{story_id}`. The story does
    /// not need to be fetched first, except to preserve labels (see
    /// [`StoryUpdate`]).
    #[instrument(skip(self, update), fields(project_id = self.context.project_id))]
    pub fn update_story(&self, story_id: u64, update: &StoryUpdate) -> Result<Story> {
        check_id(Story::KIND, story_id)?;
        if update.is_empty() {
            return Err(ApiError::InvalidInput("story update has no fields set".to_string()));
        }
        info!("Updating story");

        let url = self.project_url(&format!("{}/{}", Story::COLLECTION, story_id));
        let context = format!("{} {}", Story::KIND, story_id);
        let body = self.fetch_with_body(Method::PUT, &url, &context, update)?;
        resource::decode(&body)
    }

    /// Delete a story.
    ///
    /// Calls `DELETE /projects/{project_id}/stories/{story_id}`.
    #[instrument(skip(self), fields(project_id = self.context.project_id))]
    pub fn delete_story(&self, story_id: u64) -> Result<()> {
        check_id(Story::KIND, story_id)?;
        info!("Deleting story");

        let url = self.project_url(&format!("{}/{}", Story::COLLECTION, story_id));
        let context = format!("{} {}", Story::KIND, story_id);
        self.send(self.request(Method::DELETE, &url), &context)?;
        Ok(())
    }

    /// Add a comment to a story.
    ///
    /// Calls `POST /projects/{project_id}/stories/{story_id}/comments`.
    #[instrument(skip(self, text), fields(project_id = self.context.project_id))]
    pub fn add_comment(&self, story_id: u64, text: &str) -> Result<Comment> {
        check_id(Story::KIND, story_id)?;
        if text.trim().is_empty() {
            return Err(ApiError::InvalidInput("comment text cannot be empty".to_string()));
        }
        debug!("Adding comment");

        let url = self.project_url(&format!("{}/{}/comments", Story::COLLECTION, story_id));
        let context = format!("{} {}", Story::KIND, story_id);
        let body = self.fetch_with_body(Method::POST, &url, &context, &NewComment { text })?;
        resource::decode(&body)
    }

    /// Build `{base_url}projects/{project_id}[/{path}]`.
    fn project_url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}projects/{}", self.base_url, self.context.project_id)
        } else {
            format!("{}projects/{}/{}", self.base_url, self.context.project_id, path)
        }
    }

    /// Build a collection URL with an optional filter and extra parameters.
    fn collection_url(
        &self,
        collection: &str,
        filter: Option<&str>,
        params: &[(&str, String)],
    ) -> String {
        let mut query: Vec<String> = Vec::new();
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            query.push(format!("filter={}", urlencoding::encode(filter)));
        }
        query.extend(params.iter().map(|(k, v)| format!("{}={}", k, v)));

        let url = self.project_url(collection);
        if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query.join("&"))
        }
    }

    fn collection_context(&self, collection: &str) -> String {
        format!("{} of project {}", collection, self.context.project_id)
    }

    /// Start a request with the headers every call carries.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");

        match self.context.auth.header_value() {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    /// Send a bodiless request and return the response body.
    fn fetch(&self, method: Method, url: &str, context: &str) -> Result<String> {
        let response = self.send(self.request(method, url), context)?;
        Ok(response.text()?)
    }

    /// Send a request with a JSON body and return the response body.
    fn fetch_with_body<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        context: &str,
        body: &B,
    ) -> Result<String> {
        let response = self.send(self.request(method, url).json(body), context)?;
        Ok(response.text()?)
    }

    /// Send the request and turn any non-success status into an error.
    ///
    /// `context` names what was requested, for `NotFound` messages.
    #[instrument(skip(self, request), level = "debug")]
    fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request.send()?;
        let status = response.status();
        debug!("Response status: {}", status);

        if status.is_success() {
            Ok(response)
        } else {
            // The body is diagnostics only; an unreadable one is reported as empty
            let body = response.text().unwrap_or_default();
            debug!("Error response body: {}", body);
            Err(ApiError::from_status(status, context, &body))
        }
    }
}

/// Reject identifiers Tracker can never have.
fn check_id(kind: &str, id: u64) -> Result<()> {
    if id == 0 {
        Err(ApiError::InvalidInput(format!(
            "{} id must be a positive integer",
            kind
        )))
    } else {
        Ok(())
    }
}

/// Read the `X-Tracker-Pagination-*` headers, if all of them are present.
fn parse_pagination(headers: &HeaderMap) -> Option<Pagination> {
    let read = |name: &str| -> Option<u32> { headers.get(name)?.to_str().ok()?.trim().parse().ok() };

    Some(Pagination {
        total: read(PAGINATION_TOTAL)?,
        offset: read(PAGINATION_OFFSET)?,
        limit: read(PAGINATION_LIMIT)?,
        returned: read(PAGINATION_RETURNED)?,
    })
}

/// Normalize the base URL to exactly one trailing slash.
fn normalize_base_url(url: &str) -> Result<String> {
    let url = url.trim();

    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(ApiError::InvalidUrl(format!(
            "'{}' must start with http:// or https://",
            url
        )));
    }

    let url = url.trim_end_matches('/');

    // Warn if not HTTPS (but don't enforce for localhost/testing)
    if !url.starts_with("https://") && !url.contains("localhost") && !url.contains("127.0.0.1") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    Ok(format!("{}/", url))
}
