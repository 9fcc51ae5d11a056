//! Pooled HTTP transport backed by reqwest.

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::transport::{HttpClient, HttpRequest, HttpResponse};
use async_trait::async_trait;

/// Real transport over a shared, pooled [`reqwest::Client`].
///
/// The pool is configured once from [`ClientConfig`] and shared by every
/// request; cloning shares the same pool.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Wraps an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a client from the pool and timeout settings of `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(concat!("deliverykit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::other(e.to_string()))?;
        Ok(Self { client })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::timeout(error.to_string())
    } else if error.is_connect() || error.is_request() {
        TransportError::connection(error.to_string())
    } else {
        TransportError::other(error.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .get(&request.url)
            .query(&request.query)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
