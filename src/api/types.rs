//! Tracker API request and response types.
//!
//! These types model the Tracker REST API v5 payloads for stories, projects
//! and comments. Decoded resources are read-only: fields are private and
//! exposed through accessors. Keys the schema does not name are kept in an
//! `extra` map rather than dropped, so nothing the service sent is lost.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::datetime::format_timestamp;
use super::resource::{ProjectResource, Resource};

/// The kind of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryType {
    /// A user-facing feature.
    Feature,
    /// A defect.
    Bug,
    /// Work with no direct user value.
    Chore,
    /// A release marker.
    Release,
}

impl StoryType {
    /// The wire name of the story type.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryType::Feature => "feature",
            StoryType::Bug => "bug",
            StoryType::Chore => "chore",
            StoryType::Release => "release",
        }
    }
}

impl fmt::Display for StoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label reference as it appears inside a story payload.
#[derive(Debug, Deserialize)]
struct LabelRef {
    name: String,
}

/// A Tracker story.
///
/// Returned by `GET /projects/{project_id}/stories/{story_id}` or as an
/// element of `GET /projects/{project_id}/stories`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Story {
    id: u64,
    #[serde(default)]
    project_id: Option<u64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    story_type: Option<StoryType>,
    #[serde(default)]
    current_state: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    estimate: Option<f64>,
    #[serde(default)]
    requested_by_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    owner_ids: Vec<u64>,
    #[serde(default, deserialize_with = "label_names")]
    labels: BTreeSet<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    url: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl Story {
    /// Get the story ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the ID of the project the story belongs to, if reported.
    pub fn project_id(&self) -> Option<u64> {
        self.project_id
    }

    /// Get the story name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the story description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Get the story type.
    pub fn story_type(&self) -> Option<StoryType> {
        self.story_type
    }

    /// Get the current workflow state (e.g. "unstarted", "accepted").
    ///
    /// Payloads may carry the short `state` key instead; `current_state`
    /// wins when both are present.
    pub fn current_state(&self) -> Option<&str> {
        self.current_state.as_deref().or(self.state.as_deref())
    }

    /// Shorthand for [`Story::current_state`].
    pub fn state(&self) -> Option<&str> {
        self.current_state()
    }

    /// Get the point estimate, if the story is estimated.
    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }

    /// Get the ID of the person who requested the story.
    pub fn requested_by_id(&self) -> Option<u64> {
        self.requested_by_id
    }

    /// Get the IDs of the story owners.
    pub fn owner_ids(&self) -> &[u64] {
        &self.owner_ids
    }

    /// Get the label names, sorted.
    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Check whether the story carries a label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Get the labels as a sorted, comma-delimited string.
    ///
    /// Returns `None` when the story has no labels.
    pub fn labels_string(&self) -> Option<String> {
        if self.labels.is_empty() {
            None
        } else {
            Some(self.labels.iter().map(String::as_str).collect::<Vec<_>>().join(","))
        }
    }

    /// When the story was created.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// When the story was last updated.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// When the story was accepted, if it has been.
    pub fn accepted_at(&self) -> Option<DateTime<Utc>> {
        self.accepted_at
    }

    /// The story deadline (release stories only).
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// URL to view the story in Tracker.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Get a field the schema does not name, by key.
    pub fn extra_field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// All fields the schema does not name, in key order.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}

impl Resource for Story {
    const KIND: &'static str = "story";

    fn id(&self) -> u64 {
        self.id
    }
}

impl ProjectResource for Story {
    const COLLECTION: &'static str = "stories";
}

impl fmt::Display for Story {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = DisplayFields::new(f, "Story")?;
        out.field("id", self.id)?;
        out.opt("project_id", self.project_id)?;
        out.quoted("name", self.name.as_deref())?;
        out.opt("story_type", self.story_type)?;
        out.opt("current_state", self.current_state())?;
        out.opt("estimate", self.estimate)?;
        out.opt("requested_by_id", self.requested_by_id)?;
        if !self.owner_ids.is_empty() {
            out.field("owner_ids", format_args!("{:?}", self.owner_ids))?;
        }
        out.opt("labels", self.labels_string())?;
        out.time("created_at", self.created_at.as_ref())?;
        out.time("updated_at", self.updated_at.as_ref())?;
        out.time("accepted_at", self.accepted_at.as_ref())?;
        out.time("deadline", self.deadline.as_ref())?;
        out.opt("url", self.url.as_deref())?;
        out.quoted("description", self.description.as_deref())?;
        out.extras(&self.extra)?;
        out.finish()
    }
}

/// A Tracker project.
///
/// Returned by `GET /projects/{project_id}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Project {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl Project {
    /// Get the project ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the project name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get a field the schema does not name, by key.
    pub fn extra_field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

impl Resource for Project {
    const KIND: &'static str = "project";

    fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = DisplayFields::new(f, "Project")?;
        out.field("id", self.id)?;
        out.quoted("name", self.name.as_deref())?;
        out.extras(&self.extra)?;
        out.finish()
    }
}

/// A comment on a story.
///
/// Returned by `POST /projects/{project_id}/stories/{story_id}/comments`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Comment {
    id: u64,
    #[serde(default)]
    story_id: Option<u64>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    person_id: Option<u64>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl Comment {
    /// Get the comment ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the ID of the story the comment is on.
    pub fn story_id(&self) -> Option<u64> {
        self.story_id
    }

    /// Get the comment text.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Get the ID of the comment author.
    pub fn person_id(&self) -> Option<u64> {
        self.person_id
    }

    /// When the comment was posted.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Resource for Comment {
    const KIND: &'static str = "comment";

    fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = DisplayFields::new(f, "Comment")?;
        out.field("id", self.id)?;
        out.opt("story_id", self.story_id)?;
        out.opt("person_id", self.person_id)?;
        out.time("created_at", self.created_at.as_ref())?;
        out.quoted("text", self.text.as_deref())?;
        out.extras(&self.extra)?;
        out.finish()
    }
}

/// Pagination metadata from the `X-Tracker-Pagination-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Total number of matching items.
    pub total: u32,
    /// Offset of the first item in this page.
    pub offset: u32,
    /// Page size the service applied.
    pub limit: u32,
    /// Number of items in this page.
    pub returned: u32,
}

impl Pagination {
    /// Check if there are more pages of results.
    pub fn has_more(&self) -> bool {
        self.next_offset() < self.total
    }

    /// Get the offset for the next page.
    ///
    /// Saturates at `u32::MAX`; header values are not trusted to be sane.
    pub fn next_offset(&self) -> u32 {
        self.offset.saturating_add(self.returned)
    }
}

/// One page of stories.
#[derive(Debug, Clone)]
pub struct StoryPage {
    /// The stories, in the order the service returned them.
    pub stories: Vec<Story>,
    /// Pagination metadata, if the service sent it.
    pub pagination: Option<Pagination>,
}

impl StoryPage {
    /// Check if the service reported more stories past this page.
    pub fn has_more(&self) -> bool {
        self.pagination.map(|p| p.has_more()).unwrap_or(false)
    }
}

/// Request body for creating a story.
///
/// Only `name` is required by Tracker; everything else is sent when set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewStory {
    /// The story name.
    pub name: String,
    /// The story type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_type: Option<StoryType>,
    /// The initial workflow state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    /// The story description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The point estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f64>,
    /// The requester's person ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by_id: Option<u64>,
    /// The owners' person IDs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_ids: Vec<u64>,
    /// Label names.
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "label_refs")]
    pub labels: Vec<String>,
    /// Deadline (release stories only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl NewStory {
    /// Create a request for a story with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Request body for updating a story.
///
/// Only the fields that are set are sent; omitted fields stay unchanged on
/// the server. Labels replace the story's whole label set when given, so
/// fetch the story first if existing labels must be kept.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoryUpdate {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New story type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_type: Option<StoryType>,
    /// New workflow state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New point estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f64>,
    /// New requester.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by_id: Option<u64>,
    /// New owners.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_ids: Option<Vec<u64>>,
    /// New label set.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "opt_label_refs")]
    pub labels: Option<Vec<String>>,
    /// New deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl StoryUpdate {
    /// Check whether the update would change anything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.story_type.is_none()
            && self.current_state.is_none()
            && self.description.is_none()
            && self.estimate.is_none()
            && self.requested_by_id.is_none()
            && self.owner_ids.is_none()
            && self.labels.is_none()
            && self.deadline.is_none()
    }
}

/// Request body for adding a comment.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewComment<'a> {
    pub text: &'a str,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn label_names<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let labels = Option::<Vec<LabelRef>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(labels
        .into_iter()
        .map(|l| l.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

#[derive(Serialize)]
struct LabelName<'a> {
    name: &'a str,
}

fn label_refs<S>(labels: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(labels.iter().map(|name| LabelName { name: name.trim() }))
}

fn opt_label_refs<S>(labels: &Option<Vec<String>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match labels {
        Some(labels) => label_refs(labels, serializer),
        None => serializer.serialize_none(),
    }
}

/// Writes `Kind(a=1, b="two")` style summaries.
struct DisplayFields<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    first: bool,
}

impl<'a, 'b> DisplayFields<'a, 'b> {
    fn new(f: &'a mut fmt::Formatter<'b>, kind: &str) -> Result<Self, fmt::Error> {
        write!(f, "{}(", kind)?;
        Ok(Self { f, first: true })
    }

    fn field(&mut self, key: &str, value: impl fmt::Display) -> fmt::Result {
        if !self.first {
            self.f.write_str(", ")?;
        }
        self.first = false;
        write!(self.f, "{}={}", key, value)
    }

    fn opt<T: fmt::Display>(&mut self, key: &str, value: Option<T>) -> fmt::Result {
        match value {
            Some(v) => self.field(key, v),
            None => Ok(()),
        }
    }

    fn quoted(&mut self, key: &str, value: Option<&str>) -> fmt::Result {
        match value {
            Some(v) => self.field(key, format_args!("{:?}", v)),
            None => Ok(()),
        }
    }

    fn time(&mut self, key: &str, value: Option<&DateTime<Utc>>) -> fmt::Result {
        self.opt(key, value.map(format_timestamp))
    }

    fn extras(&mut self, extra: &BTreeMap<String, Value>) -> fmt::Result {
        for (key, value) in extra {
            self.field(key, value)?;
        }
        Ok(())
    }

    fn finish(self) -> fmt::Result {
        self.f.write_str(")")
    }
}
