//! Request dispatcher.

use crate::config::ClientConfig;
use crate::error::{ClientResult, DeliveryError, DeliveryResult};
use crate::mapper::{map_response, DeliveryResponse, RequestKind};
use crate::retry::{AttemptFailure, AttemptState};
use crate::sync::SyncManager;
use crate::transport::{HttpClient, HttpRequest};
use deliverykit_query::{Fetch, Query, SyncRequest, WireParameters};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A compiled request, detached from the descriptor that produced it.
///
/// Headers and the `environment` parameter are copied from the client
/// configuration when the request is prepared.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    kind: RequestKind,
    url: String,
    params: WireParameters,
    headers: BTreeMap<String, String>,
}

impl PreparedRequest {
    /// Returns what the request asks for.
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Returns the absolute URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the compiled wire parameters.
    pub fn params(&self) -> &WireParameters {
        &self.params
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    fn to_http(&self, timeout: Duration) -> HttpRequest {
        HttpRequest {
            url: self.url.clone(),
            query: self.params.to_query_pairs(),
            headers: self.headers.clone(),
            timeout,
        }
    }
}

/// Counters over the lifetime of a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Logical requests dispatched.
    pub requests: u64,
    /// Transport calls made, retries included.
    pub attempts: u64,
    /// Retries scheduled.
    pub retries: u64,
    /// Requests that ended in an error.
    pub failures: u64,
}

/// Dispatches requests and maps their responses.
///
/// Cloning is cheap; clones share the configuration, the transport and
/// the statistics.
pub struct DeliveryClient<C> {
    config: Arc<ClientConfig>,
    http: Arc<C>,
    stats: Arc<RwLock<ClientStats>>,
}

impl<C> Clone for DeliveryClient<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            http: Arc::clone(&self.http),
            stats: Arc::clone(&self.stats),
        }
    }
}

#[cfg(feature = "reqwest")]
impl DeliveryClient<crate::http::ReqwestClient> {
    /// Creates a client over a pooled reqwest transport.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        let http = crate::http::ReqwestClient::from_config(&config)?;
        Self::new(config, http)
    }
}

impl<C: HttpClient + 'static> DeliveryClient<C> {
    /// Creates a client over `http`, checking the credentials first.
    pub fn new(config: ClientConfig, http: C) -> ClientResult<Self> {
        Self::with_shared(config, Arc::new(http))
    }

    /// Creates a client over a shared transport.
    pub fn with_shared(config: ClientConfig, http: Arc<C>) -> ClientResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            http,
            stats: Arc::new(RwLock::new(ClientStats::default())),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn http(&self) -> &Arc<C> {
        &self.http
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> ClientStats {
        self.stats.read().clone()
    }

    /// Returns a sync manager sharing this client.
    pub fn sync_manager(&self) -> SyncManager<C> {
        SyncManager::new(self.clone())
    }

    fn prepare(&self, kind: RequestKind, path: String, params: WireParameters) -> PreparedRequest {
        let mut params = params;
        params.insert_default("environment", self.config.environment.clone());
        PreparedRequest {
            kind,
            url: format!("{}{}", self.config.base_url(), path),
            params,
            headers: self.config.default_headers(),
        }
    }

    /// Compiles a query into a request.
    pub fn prepare_query(&self, query: &Query) -> PreparedRequest {
        self.prepare(
            RequestKind::for_query(query.target()),
            query.target().path(&self.config.api_version),
            query.compile(),
        )
    }

    /// Compiles a fetch into a request.
    pub fn prepare_fetch(&self, fetch: &Fetch) -> PreparedRequest {
        self.prepare(
            RequestKind::for_fetch(fetch.target()),
            fetch.target().path(&self.config.api_version),
            fetch.compile(),
        )
    }

    /// Compiles a sync request.
    pub fn prepare_sync(&self, request: &SyncRequest) -> PreparedRequest {
        self.prepare(
            RequestKind::Sync,
            SyncRequest::path(&self.config.api_version),
            request.compile(),
        )
    }

    /// Runs a prepared request to completion under the retry policy.
    ///
    /// Attempts are sequential. When the budget runs out, the last
    /// failure is returned.
    pub async fn execute(&self, request: &PreparedRequest) -> DeliveryResult<DeliveryResponse> {
        let policy = &self.config.retry;
        self.stats.write().requests += 1;
        let mut attempt = 0u32;

        loop {
            debug!(
                state = ?AttemptState::Attempting,
                attempt,
                url = %request.url,
                "Sending request"
            );
            self.stats.write().attempts += 1;

            let (delay, error) = match self.http.get(request.to_http(self.config.timeout)).await {
                Ok(response) => match map_response(&request.kind, &response) {
                    Ok(mapped) => {
                        debug!(state = ?AttemptState::Done, status = response.status, "Request completed");
                        return Ok(mapped);
                    }
                    Err(error) => {
                        let failure = AttemptFailure::Status {
                            code: response.status,
                            retry_after: response.retry_after(),
                        };
                        (policy.next_delay(attempt, &failure), error)
                    }
                },
                Err(err) => (
                    policy.next_delay(attempt, &AttemptFailure::Transport(&err)),
                    DeliveryError::transport(&err),
                ),
            };

            match delay {
                Some(delay) => {
                    warn!(
                        state = ?AttemptState::Waiting,
                        attempt,
                        ?delay,
                        status = ?error.status,
                        error = %error,
                        "Retrying request"
                    );
                    self.stats.write().retries += 1;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    debug!(
                        state = ?AttemptState::Failed,
                        attempt,
                        status = ?error.status,
                        error = %error,
                        "Request failed"
                    );
                    self.stats.write().failures += 1;
                    return Err(error);
                }
            }
        }
    }

    /// Runs a query.
    pub async fn find(&self, query: &Query) -> DeliveryResult<DeliveryResponse> {
        self.execute(&self.prepare_query(query)).await
    }

    /// Runs a query and converts the result.
    pub async fn find_as<T>(&self, query: &Query) -> DeliveryResult<T>
    where
        T: TryFrom<DeliveryResponse, Error = DeliveryError>,
    {
        self.find(query).await.and_then(T::try_from)
    }

    /// Runs a fetch.
    pub async fn fetch(&self, fetch: &Fetch) -> DeliveryResult<DeliveryResponse> {
        self.execute(&self.prepare_fetch(fetch)).await
    }

    /// Runs a fetch and converts the result.
    pub async fn fetch_as<T>(&self, fetch: &Fetch) -> DeliveryResult<T>
    where
        T: TryFrom<DeliveryResponse, Error = DeliveryError>,
    {
        self.fetch(fetch).await.and_then(T::try_from)
    }

    /// Spawns `request` and hands the outcome to `callback` exactly once.
    ///
    /// A `None` callback discards the outcome. Must be called from within
    /// a tokio runtime.
    pub fn dispatch_with<F>(&self, request: PreparedRequest, callback: Option<F>) -> JoinHandle<()>
    where
        F: FnOnce(DeliveryResult<DeliveryResponse>) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            let result = client.execute(&request).await;
            if let Some(callback) = callback {
                callback(result);
            }
        })
    }

    /// Spawns a query. The query is compiled before this returns, so
    /// later changes to it do not affect the dispatched request.
    pub fn find_with<F>(&self, query: &Query, callback: Option<F>) -> JoinHandle<()>
    where
        F: FnOnce(DeliveryResult<DeliveryResponse>) + Send + 'static,
    {
        self.dispatch_with(self.prepare_query(query), callback)
    }

    /// Spawns a fetch.
    pub fn fetch_with<F>(&self, fetch: &Fetch, callback: Option<F>) -> JoinHandle<()>
    where
        F: FnOnce(DeliveryResult<DeliveryResponse>) + Send + 'static,
    {
        self.dispatch_with(self.prepare_fetch(fetch), callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ErrorKind, TransportError};
    use crate::model::{Entry, EntryCollection};
    use crate::retry::RetryPolicy;
    use crate::transport::MockHttpClient;
    use deliverykit_query::prelude::*;
    use serde_json::json;
    use tokio::sync::oneshot;

    fn config() -> ClientConfig {
        let mut retry = RetryPolicy::new();
        retry.set_base_delay(Duration::from_millis(1));
        ClientConfig::new("key", "token", "production")
            .with_host("http://localhost")
            .with_retry(retry)
    }

    fn client() -> DeliveryClient<MockHttpClient> {
        DeliveryClient::new(config(), MockHttpClient::new()).unwrap()
    }

    fn entries_body() -> serde_json::Value {
        json!({ "entries": [{ "uid": "e1", "title": "Women" }] })
    }

    #[test]
    fn new_rejects_missing_credentials() {
        let result = DeliveryClient::new(
            ClientConfig::new("key", "", "production"),
            MockHttpClient::new(),
        );
        assert!(matches!(
            result,
            Err(crate::error::ClientError::Config(ConfigError::MissingCredential(
                "delivery_token"
            )))
        ));
    }

    #[test]
    fn prepared_requests_copy_headers_and_environment() {
        let client = client();
        let mut query = Query::entries("product");
        query.where_eq("title", "Women").unwrap().limit(0);

        let prepared = client.prepare_query(&query);
        assert_eq!(prepared.url(), "http://localhost/v3/content_types/product/entries");
        assert_eq!(prepared.kind(), &RequestKind::Entries {
            content_type_uid: "product".into()
        });
        assert_eq!(prepared.params().get("environment"), Some(&json!("production")));
        assert_eq!(prepared.params().get("limit"), Some(&json!(0)));
        assert_eq!(prepared.headers().get("api_key").map(String::as_str), Some("key"));
        assert_eq!(
            prepared.headers().get("access_token").map(String::as_str),
            Some("token")
        );

        query.where_eq("title", "Men").unwrap();
        assert_eq!(
            prepared.params().get("query"),
            Some(&json!({ "title": "Women" }))
        );
    }

    #[test]
    fn raw_environment_param_wins() {
        let client = client();
        let mut fetch = Fetch::entry("product", "e1");
        fetch.add_param("environment", "staging").unwrap();
        let prepared = client.prepare_fetch(&fetch);
        assert_eq!(prepared.params().get("environment"), Some(&json!("staging")));
        assert_eq!(
            prepared.url(),
            "http://localhost/v3/content_types/product/entries/e1"
        );
    }

    #[tokio::test]
    async fn find_maps_entries() {
        let client = client();
        client.http().push_json(200, entries_body());

        let collection: EntryCollection = client
            .find_as(&Query::entries("product"))
            .await
            .unwrap();
        assert_eq!(collection.entries[0].uid, "e1");

        let request = &client.http().requests()[0];
        assert_eq!(request.query_param("environment"), Some("production"));
        assert_eq!(request.headers.get("api_key").map(String::as_str), Some("key"));
    }

    #[tokio::test]
    async fn retries_retryable_statuses_then_succeeds() {
        let client = client();
        client.http().push_json(503, json!({ "error_message": "busy" }));
        client.http().push_error(TransportError::timeout("slow"));
        client.http().push_json(200, entries_body());

        let result = client.find(&Query::entries("product")).await;
        assert!(result.is_ok());
        assert_eq!(client.http().request_count(), 3);
        let stats = client.stats();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let client = client();
        client.http().push_json(
            404,
            json!({ "error_message": "Entry was not found.", "error_code": 141 }),
        );
        client.http().push_json(200, entries_body());

        let err = client.fetch(&Fetch::entry("product", "missing")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Service);
        assert_eq!(err.code, 141);
        assert_eq!(client.http().request_count(), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_delivers_last_failure() {
        let mut config = config();
        config.retry.set_retry_limit(2).unwrap();
        let client = DeliveryClient::new(config, MockHttpClient::new()).unwrap();
        client.http().push_json(502, json!({ "error_message": "first" }));
        client.http().push_json(502, json!({ "error_message": "second" }));
        client.http().push_json(504, json!({ "error_message": "last" }));
        client.http().push_json(200, entries_body());

        let err = client.find(&Query::entries("product")).await.unwrap_err();
        assert_eq!(err.message, "last");
        assert_eq!(err.status, Some(504));
        assert_eq!(client.http().request_count(), 3);
        assert_eq!(client.stats().failures, 1);
    }

    #[tokio::test]
    async fn disabled_policy_makes_one_attempt() {
        let config = config().with_retry(RetryPolicy::disabled());
        let client = DeliveryClient::new(config, MockHttpClient::new()).unwrap();
        client.http().push_error(TransportError::connection("reset"));

        let err = client.find(&Query::entries("product")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
        assert_eq!(err.code, 0);
        assert_eq!(client.http().request_count(), 1);
    }

    #[tokio::test]
    async fn find_with_invokes_callback_once() {
        let client = client();
        client.http().push_json(200, json!({ "entry": { "uid": "e1" } }));

        let (tx, rx) = oneshot::channel();
        let handle = client.fetch_with(
            &Fetch::entry("product", "e1"),
            Some(move |result: DeliveryResult<DeliveryResponse>| {
                let _ = tx.send(result);
            }),
        );
        handle.await.unwrap();

        let entry = Entry::try_from(rx.await.unwrap().unwrap()).unwrap();
        assert_eq!(entry.uid, "e1");
    }

    #[tokio::test]
    async fn missing_callback_is_a_silent_delivery() {
        let client = client();
        client.http().push_json(500, json!({}));
        let handle = client.find_with(
            &Query::entries("product"),
            None::<fn(DeliveryResult<DeliveryResponse>)>,
        );
        assert!(handle.await.is_ok());
        assert_eq!(client.stats().failures, 1);
    }

    #[tokio::test]
    async fn wrong_target_type_is_a_decode_error() {
        let client = client();
        client.http().push_json(200, json!({ "asset": { "uid": "a1" } }));
        let err = client
            .fetch_as::<Entry>(&Fetch::asset("a1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
    }
}
