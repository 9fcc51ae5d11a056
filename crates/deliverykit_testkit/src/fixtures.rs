//! JSON fixtures and client helpers.

use deliverykit_client::{ClientConfig, DeliveryClient, HttpClient, RetryPolicy};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// API key accepted by the fake server.
pub const TEST_API_KEY: &str = "blt-test-api-key";
/// Delivery token accepted by the fake server.
pub const TEST_DELIVERY_TOKEN: &str = "cs-test-delivery-token";
/// Environment used by test clients.
pub const TEST_ENVIRONMENT: &str = "test";
/// Host used by test clients.
pub const TEST_HOST: &str = "http://delivery.test";

/// Retry policy with millisecond delays.
pub fn fast_retry_policy() -> RetryPolicy {
    let mut policy = RetryPolicy::new();
    policy
        .set_base_delay(Duration::from_millis(1))
        .set_max_delay(Duration::from_millis(5));
    policy
}

/// Client configuration matching the fake server's credentials.
pub fn test_config() -> ClientConfig {
    ClientConfig::new(TEST_API_KEY, TEST_DELIVERY_TOKEN, TEST_ENVIRONMENT)
        .with_host(TEST_HOST)
        .with_retry(fast_retry_policy())
}

/// Creates a client over `http` with [`test_config`].
pub fn test_client<C: HttpClient + 'static>(http: C) -> DeliveryClient<C> {
    shared_test_client(Arc::new(http))
}

/// Creates a client over a shared transport with [`test_config`].
pub fn shared_test_client<C: HttpClient + 'static>(http: Arc<C>) -> DeliveryClient<C> {
    DeliveryClient::with_shared(test_config(), http).expect("test config is valid")
}

/// An entry object.
pub fn entry_json(uid: &str, title: &str) -> Value {
    json!({
        "uid": uid,
        "title": title,
        "locale": "en-us",
        "_version": 1,
        "updated_at": "2024-01-15T09:30:00.000Z"
    })
}

/// An asset object.
pub fn asset_json(uid: &str, filename: &str) -> Value {
    json!({
        "uid": uid,
        "title": filename,
        "filename": filename,
        "url": format!("https://assets.delivery.test/{uid}/{filename}"),
        "content_type": "image/png",
        "file_size": "1024"
    })
}

/// A sync item for entry `uid`.
pub fn sync_item_json(uid: &str, kind: &str, event_at: &str) -> Value {
    json!({
        "type": kind,
        "content_type_uid": "blog",
        "event_at": event_at,
        "data": { "uid": uid, "title": format!("Post {uid}") }
    })
}

/// A service error body.
pub fn error_body(message: &str, code: i64) -> Value {
    json!({ "error_message": message, "error_code": code, "errors": {} })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_valid() {
        let config = test_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), TEST_HOST);
        assert_eq!(config.retry.base_delay(), Duration::from_millis(1));
    }

    #[test]
    fn fixtures_have_uids() {
        assert_eq!(entry_json("e1", "Women")["uid"], "e1");
        assert_eq!(asset_json("a1", "logo.png")["filename"], "logo.png");
        assert_eq!(
            sync_item_json("e1", "entry_published", "2024-01-01T00:00:00.000Z")["data"]["uid"],
            "e1"
        );
    }
}
