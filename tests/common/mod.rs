//! In-process Tracker fixture server for integration tests.
//!
//! Serves a small slice of the Tracker v5 API for project 42 with token
//! "abc" from an in-memory story list, and records every request it sees so
//! tests can check what went over the wire.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const PROJECT_ID: u64 = 42;
pub const TOKEN: &str = "abc";

/// A story id the fixture answers with a payload of the wrong shape.
pub const MALFORMED_STORY_ID: u64 = 777;
/// A story id the fixture answers with HTTP 500.
pub const BROKEN_STORY_ID: u64 = 500;

/// One request as the fixture received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub token: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug)]
struct FixtureState {
    stories: Vec<Value>,
    next_story_id: u64,
    next_comment_id: u64,
    requests: Vec<RecordedRequest>,
}

/// Handle to a running fixture server.
#[derive(Clone)]
pub struct Fixture {
    state: Arc<Mutex<FixtureState>>,
    base_url: String,
}

impl Fixture {
    /// Start a fixture server on a random local port.
    pub fn start() -> Self {
        let state = Arc::new(Mutex::new(FixtureState {
            stories: seed_stories(),
            next_story_id: 900_000_001,
            next_comment_id: 300,
            requests: Vec::new(),
        }));

        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        let app = router(state.clone());
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                axum::serve(listener, app).await
            })
            .unwrap();
        });

        Self {
            state,
            base_url: format!("http://{}/services/v5", addr),
        }
    }

    /// The API root to point a client at.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    /// The most recent request.
    pub fn last_request(&self) -> RecordedRequest {
        self.requests().last().cloned().expect("no request recorded")
    }

    /// The stored payload of a story, if it exists.
    pub fn story(&self, id: u64) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .stories
            .iter()
            .find(|s| s["id"] == id)
            .cloned()
    }
}

/// A local URL nothing is listening on.
pub fn closed_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/services/v5", addr)
}

fn seed_stories() -> Vec<Value> {
    vec![
        json!({
            "kind": "story",
            "id": 123456790,
            "project_id": 42,
            "name": "Add password reset",
            "story_type": "feature",
            "current_state": "unstarted",
            "estimate": 2,
            "requested_by_id": 101,
            "owner_ids": [102],
            "labels": [{"kind": "label", "id": 1, "project_id": 42, "name": "auth"}],
            "created_at": "2013-04-30T12:00:00Z",
            "url": "https://www.pivotaltracker.com/story/show/123456790"
        }),
        json!({
            "kind": "story",
            "id": 123456791,
            "project_id": 42,
            "name": "Tune search ranking",
            "story_type": "chore",
            "current_state": "started",
            "owner_ids": [101, 102]
        }),
        json!({
            "id": 123456789,
            "name": "Fix login bug",
            "state": "unstarted"
        }),
        json!({
            "kind": "story",
            "id": 123456792,
            "project_id": 42,
            "name": "Spring release",
            "story_type": "release",
            "current_state": "unscheduled",
            "deadline": "2013-06-01T00:00:00Z"
        }),
    ]
}

fn router(state: Arc<Mutex<FixtureState>>) -> Router {
    Router::new()
        .route("/services/v5/projects/{project_id}", get(get_project))
        .route(
            "/services/v5/projects/{project_id}/stories",
            get(list_stories).post(create_story),
        )
        .route(
            "/services/v5/projects/{project_id}/stories/{story_id}",
            get(get_story).put(update_story).delete(delete_story),
        )
        .route(
            "/services/v5/projects/{project_id}/stories/{story_id}/comments",
            post(add_comment),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    filter: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
}

fn record(state: &Arc<Mutex<FixtureState>>, method: &Method, uri: &Uri, headers: &HeaderMap) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.lock().unwrap().requests.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        token: header("x-trackertoken"),
        user_agent: header("user-agent"),
    });
}

fn tracker_error(status: StatusCode, code: &str, error: &str, problem: Option<&str>) -> Response {
    let mut body = json!({"kind": "error", "code": code, "error": error});
    if let Some(problem) = problem {
        body["general_problem"] = Value::from(problem);
    }
    (status, Json(body)).into_response()
}

fn not_found() -> Response {
    tracker_error(
        StatusCode::NOT_FOUND,
        "unfound_resource",
        "The object you tried to access could not be found.",
        None,
    )
}

/// Token and project checks every route shares.
fn authorize(headers: &HeaderMap, project_id: u64) -> Result<(), Response> {
    let token = headers.get("x-trackertoken").and_then(|v| v.to_str().ok());
    if token != Some(TOKEN) {
        return Err(tracker_error(
            StatusCode::FORBIDDEN,
            "unauthorized_operation",
            "Authorization failure.",
            Some("You aren't authorized to access the requested resource."),
        ));
    }
    if project_id != PROJECT_ID {
        return Err(not_found());
    }
    Ok(())
}

fn story_state(story: &Value) -> Option<&str> {
    story
        .get("current_state")
        .or_else(|| story.get("state"))
        .and_then(Value::as_str)
}

/// Match a story against a whitespace-separated list of `key:value` terms.
fn matches_filter(story: &Value, filter: &str) -> Result<bool, String> {
    for term in filter.split_whitespace() {
        let (key, value) = term
            .split_once(':')
            .ok_or_else(|| format!("Malformed filter term '{}'", term))?;
        let hit = match key {
            "state" => story_state(story) == Some(value),
            "type" => story.get("story_type").and_then(Value::as_str) == Some(value),
            "label" => story
                .get("labels")
                .and_then(Value::as_array)
                .map(|labels| labels.iter().any(|l| l["name"] == value))
                .unwrap_or(false),
            other => return Err(format!("Unknown filter field '{}'", other)),
        };
        if !hit {
            return Ok(false);
        }
    }
    Ok(true)
}

async fn get_project(
    State(state): State<Arc<Mutex<FixtureState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(project_id): Path<u64>,
) -> Response {
    record(&state, &method, &uri, &headers);
    if let Err(resp) = authorize(&headers, project_id) {
        return resp;
    }
    Json(json!({
        "kind": "project",
        "id": PROJECT_ID,
        "name": "Website",
        "week_start_day": "Monday"
    }))
    .into_response()
}

async fn list_stories(
    State(state): State<Arc<Mutex<FixtureState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(project_id): Path<u64>,
    Query(params): Query<ListParams>,
) -> Response {
    record(&state, &method, &uri, &headers);
    if let Err(resp) = authorize(&headers, project_id) {
        return resp;
    }

    let stories = state.lock().unwrap().stories.clone();
    let mut matched = Vec::new();
    for story in stories {
        match matches_filter(&story, params.filter.as_deref().unwrap_or("")) {
            Ok(true) => matched.push(story),
            Ok(false) => {}
            Err(problem) => {
                return tracker_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_parameter",
                    "One or more request parameters was missing or invalid.",
                    Some(&problem),
                )
            }
        }
    }

    let Some(limit) = params.limit else {
        return Json(Value::Array(matched)).into_response();
    };

    let total = matched.len();
    let offset = params.offset.unwrap_or(0).min(total);
    let page: Vec<Value> = matched.into_iter().skip(offset).take(limit).collect();
    let returned = page.len();

    let mut resp = Json(Value::Array(page)).into_response();
    let h = resp.headers_mut();
    h.insert("x-tracker-pagination-total", HeaderValue::from(total));
    h.insert("x-tracker-pagination-offset", HeaderValue::from(offset));
    h.insert("x-tracker-pagination-limit", HeaderValue::from(limit));
    h.insert("x-tracker-pagination-returned", HeaderValue::from(returned));
    resp
}

async fn get_story(
    State(state): State<Arc<Mutex<FixtureState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path((project_id, story_id)): Path<(u64, u64)>,
) -> Response {
    record(&state, &method, &uri, &headers);
    if let Err(resp) = authorize(&headers, project_id) {
        return resp;
    }

    match story_id {
        MALFORMED_STORY_ID => {
            return Json(json!({"kind": "story", "id": story_id, "story_type": "epic"}))
                .into_response()
        }
        BROKEN_STORY_ID => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        _ => {}
    }

    let found = state
        .lock()
        .unwrap()
        .stories
        .iter()
        .find(|s| s["id"] == story_id)
        .cloned();
    match found {
        Some(story) => Json(story).into_response(),
        None => not_found(),
    }
}

async fn create_story(
    State(state): State<Arc<Mutex<FixtureState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(project_id): Path<u64>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    record(&state, &method, &uri, &headers);
    if let Err(resp) = authorize(&headers, project_id) {
        return resp;
    }
    if !body.get("name").map(Value::is_string).unwrap_or(false) {
        return tracker_error(
            StatusCode::BAD_REQUEST,
            "invalid_parameter",
            "One or more request parameters was missing or invalid.",
            Some("'name' is required"),
        );
    }

    let mut guard = state.lock().unwrap();
    let id = guard.next_story_id;
    guard.next_story_id += 1;

    let mut story = body;
    story.insert("kind".to_string(), Value::from("story"));
    story.insert("id".to_string(), Value::from(id));
    story.insert("project_id".to_string(), Value::from(PROJECT_ID));
    story
        .entry("current_state".to_string())
        .or_insert_with(|| Value::from("unscheduled"));
    let story = Value::Object(story);
    guard.stories.push(story.clone());

    Json(story).into_response()
}

async fn update_story(
    State(state): State<Arc<Mutex<FixtureState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path((project_id, story_id)): Path<(u64, u64)>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    record(&state, &method, &uri, &headers);
    if let Err(resp) = authorize(&headers, project_id) {
        return resp;
    }

    let mut guard = state.lock().unwrap();
    let Some(story) = guard.stories.iter_mut().find(|s| s["id"] == story_id) else {
        return not_found();
    };
    if let Some(fields) = story.as_object_mut() {
        fields.extend(body);
    }
    Json(story.clone()).into_response()
}

async fn delete_story(
    State(state): State<Arc<Mutex<FixtureState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path((project_id, story_id)): Path<(u64, u64)>,
) -> Response {
    record(&state, &method, &uri, &headers);
    if let Err(resp) = authorize(&headers, project_id) {
        return resp;
    }

    let mut guard = state.lock().unwrap();
    let before = guard.stories.len();
    guard.stories.retain(|s| s["id"] != story_id);
    if guard.stories.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    text: String,
}

async fn add_comment(
    State(state): State<Arc<Mutex<FixtureState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path((project_id, story_id)): Path<(u64, u64)>,
    Json(body): Json<CommentBody>,
) -> Response {
    record(&state, &method, &uri, &headers);
    if let Err(resp) = authorize(&headers, project_id) {
        return resp;
    }

    let mut guard = state.lock().unwrap();
    if !guard.stories.iter().any(|s| s["id"] == story_id) {
        return not_found();
    }
    let id = guard.next_comment_id;
    guard.next_comment_id += 1;

    Json(json!({
        "kind": "comment",
        "id": id,
        "story_id": story_id,
        "text": body.text,
        "person_id": 101,
        "created_at": "2013-05-01T09:00:00Z"
    }))
    .into_response()
}
