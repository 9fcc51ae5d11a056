//! In-memory delivery service.
//!
//! Serves entries, assets and a sync log with stable ordering so tests
//! can check pagination and token continuation without a network.

use crate::fixtures::{error_body, TEST_API_KEY, TEST_DELIVERY_TOKEN};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deliverykit_client::{HttpClient, HttpRequest, HttpResponse, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Default sync page size.
pub const DEFAULT_SYNC_PAGE_SIZE: usize = 100;

/// A scripted failure served before normal routing.
#[derive(Debug, Clone)]
pub enum InjectedFailure {
    /// A response with this status and error body.
    Status(u16),
    /// A transport error.
    Transport(TransportError),
}

#[derive(Debug, Default)]
struct ServerState {
    entries: BTreeMap<String, Vec<Value>>,
    assets: Vec<Value>,
    sync_log: Vec<Value>,
    pagination_tokens: HashMap<String, (usize, usize)>,
    sync_tokens: HashMap<String, usize>,
    next_token: u64,
    failures: VecDeque<InjectedFailure>,
    requests: Vec<HttpRequest>,
}

impl ServerState {
    fn issue_token(&mut self, prefix: &str) -> String {
        self.next_token += 1;
        format!("{prefix}{:08x}", self.next_token)
    }
}

/// An in-memory delivery service implementing [`HttpClient`].
#[derive(Debug)]
pub struct FakeDeliveryServer {
    state: Mutex<ServerState>,
    sync_page_size: usize,
}

impl Default for FakeDeliveryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDeliveryServer {
    /// Creates an empty server.
    pub fn new() -> Self {
        Self::with_sync_page_size(DEFAULT_SYNC_PAGE_SIZE)
    }

    /// Creates an empty server that pages sync results by `page_size`.
    pub fn with_sync_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(ServerState::default()),
            sync_page_size: page_size.max(1),
        }
    }

    /// Adds an entry to `content_type_uid`.
    pub fn add_entry(&self, content_type_uid: &str, entry: Value) {
        self.state
            .lock()
            .entries
            .entry(content_type_uid.to_string())
            .or_default()
            .push(entry);
    }

    /// Adds an asset.
    pub fn add_asset(&self, asset: Value) {
        self.state.lock().assets.push(asset);
    }

    /// Appends an item to the sync log.
    pub fn add_sync_item(&self, item: Value) {
        self.state.lock().sync_log.push(item);
    }

    /// Queues `failure`. Queued failures are served in order, each to one
    /// request, before normal routing resumes.
    pub fn fail_next(&self, failure: InjectedFailure) {
        self.state.lock().failures.push_back(failure);
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Returns how many requests were received.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    fn route(&self, state: &mut ServerState, request: &HttpRequest) -> HttpResponse {
        let authorized = request.headers.get("api_key").map(String::as_str) == Some(TEST_API_KEY)
            && request.headers.get("access_token").map(String::as_str)
                == Some(TEST_DELIVERY_TOKEN);
        if !authorized {
            return HttpResponse::json(
                401,
                &error_body("You're not allowed in here unless you're logged in.", 109),
            );
        }

        let path = request.path().to_string();
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            [_, "content_types", ct, "entries"] => Self::list_entries(state, ct, request),
            [_, "content_types", ct, "entries", uid] => Self::single_entry(state, ct, uid),
            [_, "assets"] => Self::list(&state.assets, "assets", request),
            [_, "assets", uid] => Self::single(&state.assets, "asset", uid),
            [_, "stacks", "sync"] => self.sync(state, request),
            _ => not_found("The requested resource does not exist.", 404),
        }
    }

    fn list_entries(state: &ServerState, ct: &str, request: &HttpRequest) -> HttpResponse {
        let Some(entries) = state.entries.get(ct) else {
            return not_found("The Content Type was not found.", 118);
        };
        let filter = request
            .query_param("query")
            .and_then(|q| serde_json::from_str::<Map<String, Value>>(q).ok())
            .unwrap_or_default();
        let matching: Vec<Value> = entries
            .iter()
            .filter(|entry| matches_equalities(entry, &filter))
            .cloned()
            .collect();
        let mut response = Self::list(&matching, "entries", request);
        if request.query_param("include_content_type") == Some("true") {
            if let Ok(mut body) = serde_json::from_slice::<Value>(&response.body) {
                body["content_type"] = json!({ "uid": ct, "title": ct, "schema": [] });
                response = HttpResponse::json(200, &body);
            }
        }
        response
    }

    fn single_entry(state: &ServerState, ct: &str, uid: &str) -> HttpResponse {
        match state.entries.get(ct) {
            Some(entries) => Self::single(entries, "entry", uid),
            None => not_found("The Content Type was not found.", 118),
        }
    }

    fn list(records: &[Value], key: &str, request: &HttpRequest) -> HttpResponse {
        let skip = parse_number(request.query_param("skip")).unwrap_or(0);
        let limit = parse_number(request.query_param("limit")).unwrap_or(100);
        let page: Vec<Value> = records.iter().skip(skip).take(limit).cloned().collect();
        let mut body = Map::new();
        body.insert(key.to_string(), Value::Array(page));
        if request.query_param("include_count") == Some("true") {
            body.insert("count".to_string(), json!(records.len()));
        }
        HttpResponse::json(200, &Value::Object(body))
    }

    fn single(records: &[Value], key: &str, uid: &str) -> HttpResponse {
        match records.iter().find(|r| r["uid"] == uid) {
            Some(record) => HttpResponse::json(200, &json!({ key: record })),
            None => not_found("The requested object does not exist.", 141),
        }
    }

    fn sync(&self, state: &mut ServerState, request: &HttpRequest) -> HttpResponse {
        // (start offset, batch end) within the sync log
        let window = if let Some(token) = request.query_param("pagination_token") {
            state.pagination_tokens.get(token).copied()
        } else if let Some(token) = request.query_param("sync_token") {
            state
                .sync_tokens
                .get(token)
                .map(|start| (*start, state.sync_log.len()))
        } else if let Some(from) = request.query_param("start_from") {
            DateTime::parse_from_rfc3339(from).ok().map(|from| {
                let from = from.with_timezone(&Utc);
                let start = state
                    .sync_log
                    .iter()
                    .position(|item| event_time(item).is_some_and(|at| at > from))
                    .unwrap_or(state.sync_log.len());
                (start, state.sync_log.len())
            })
        } else if request.query_param("init") == Some("true") {
            Some((0, state.sync_log.len()))
        } else {
            None
        };

        let Some((start, end)) = window else {
            return HttpResponse::json(
                422,
                &json!({
                    "error_message": "Is not valid.",
                    "error_code": 141,
                    "errors": { "sync_token": ["is not valid."] }
                }),
            );
        };

        let stop = (start + self.sync_page_size).min(end);
        let items: Vec<Value> = state.sync_log[start..stop].to_vec();
        let mut body = json!({
            "items": items,
            "skip": start,
            "limit": self.sync_page_size,
            "total_count": end,
        });
        if stop < end {
            let token = state.issue_token("pt");
            state.pagination_tokens.insert(token.clone(), (stop, end));
            body["pagination_token"] = json!(token);
        } else {
            let token = state.issue_token("st");
            state.sync_tokens.insert(token.clone(), end);
            body["sync_token"] = json!(token);
        }
        HttpResponse::json(200, &body)
    }
}

#[async_trait]
impl HttpClient for FakeDeliveryServer {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        if let Some(failure) = state.failures.pop_front() {
            return match failure {
                InjectedFailure::Status(status) => Ok(HttpResponse::json(
                    status,
                    &error_body("Injected failure.", i64::from(status)),
                )),
                InjectedFailure::Transport(err) => Err(err),
            };
        }
        Ok(self.route(&mut state, &request))
    }
}

fn not_found(message: &str, code: i64) -> HttpResponse {
    HttpResponse::json(404, &error_body(message, code))
}

fn parse_number(value: Option<&str>) -> Option<usize> {
    value.and_then(|v| v.parse().ok())
}

fn event_time(item: &Value) -> Option<DateTime<Utc>> {
    item.get("event_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn matches_equalities(entry: &Value, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .filter(|(key, value)| !key.starts_with('$') && !value.is_object())
        .all(|(key, value)| entry.get(key) == Some(value))
}
