//! # DeliveryKit Client
//!
//! Execution engine for content-delivery requests.
//!
//! This crate provides:
//! - Client configuration (region, credentials, pool settings)
//! - Retry policy with fixed, linear, exponential or custom backoff
//! - HTTP transport abstraction with a pooled reqwest implementation
//! - Request dispatch with exactly-once result delivery
//! - Response mapping into typed domain results
//! - Sync continuation over pagination and sync tokens
//!
//! ## Request lifecycle
//!
//! 1. A [`Query`](deliverykit_query::Query) or [`Fetch`](deliverykit_query::Fetch)
//!    is configured and compiled into a [`PreparedRequest`]
//! 2. The request is attempted, and retried while the [`RetryPolicy`] allows
//! 3. The response is mapped by [`RequestKind`] into a [`DeliveryResponse`],
//!    or into a [`DeliveryError`]
//!
//! ```no_run
//! use deliverykit_client::{ClientConfig, DeliveryClient, EntryCollection};
//! use deliverykit_query::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DeliveryClient::from_config(ClientConfig::new("key", "token", "production"))?;
//! let mut query = Query::entries("product");
//! query.where_eq("title", "Women")?.limit(10);
//! let page: EntryCollection = client.find_as(&query).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
#[cfg(feature = "reqwest")]
mod http;
mod mapper;
mod model;
mod retry;
mod sync;
mod transport;

pub use client::{ClientStats, DeliveryClient, PreparedRequest};
pub use config::{ClientConfig, Region};
pub use error::{
    ClientError, ClientResult, ConfigError, DeliveryError, DeliveryResult, ErrorKind,
    TransportError, TransportErrorKind, GENERIC_ERROR_MESSAGE,
};
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
pub use mapper::{map_failure, map_response, map_success, DeliveryResponse, RequestKind};
pub use model::{
    Asset, AssetCollection, ContentType, Entry, EntryCollection, FieldMap, GlobalField, SyncItem,
    SyncPage,
};
pub use retry::{
    AttemptFailure, AttemptState, BackoffFn, BackoffStrategy, RetryPolicy,
    DEFAULT_RETRYABLE_STATUS_CODES, MAX_RETRY_LIMIT, MAX_STATUS_CODE, MIN_STATUS_CODE,
};
pub use sync::{SyncBatch, SyncManager};
pub use transport::{HttpClient, HttpRequest, HttpResponse, MockHttpClient};
