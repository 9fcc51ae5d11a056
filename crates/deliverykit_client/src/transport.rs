//! Transport seam between the dispatcher and the network.
//!
//! The dispatcher only ever issues `GET` requests with query parameters
//! and headers, so the abstraction stays that small. Tests swap in
//! [`MockHttpClient`] or an in-memory service.

use crate::error::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// One outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL without query string.
    pub url: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Returns the path component of the URL.
    pub fn path(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
    }

    /// Returns the first value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value of query parameter `name`.
    pub fn query_values(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the first header matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the wait requested through `Retry-After`, in seconds or as
    /// an HTTP date.
    pub fn retry_after(&self) -> Option<Duration> {
        let value = self.header("retry-after")?.trim();
        if let Ok(seconds) = value.parse::<u64>() {
            return Some(Duration::from_secs(seconds));
        }
        let date = DateTime::parse_from_rfc2822(value).ok()?;
        (date.with_timezone(&Utc) - Utc::now()).to_std().ok()
    }
}

/// Sends requests to the delivery service.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs a `GET`. A returned response may carry any status.
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).get(request).await
    }
}

/// A scripted transport for testing.
///
/// Outcomes are returned in FIFO order; once the script runs out every
/// call fails with a connection error.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: HttpResponse) {
        self.script.lock().push_back(Ok(response));
    }

    /// Queues a JSON response.
    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_response(HttpResponse::json(status, &body));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.script.lock().push_back(Err(error));
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Returns how many requests were received.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns how many scripted outcomes remain.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::connection("no scripted response")))
    }
}
