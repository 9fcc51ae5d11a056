//! Maps raw responses into domain results or uniform errors.

use crate::error::{DeliveryError, DeliveryResult};
use crate::model::{
    Asset, AssetCollection, ContentType, Entry, EntryCollection, GlobalField, SyncPage,
};
use crate::transport::HttpResponse;
use deliverykit_query::{FetchTarget, QueryTarget};
use serde_json::Value;
use tracing::warn;

/// What a request asked for, which decides how its response is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// One entry, under `entry`.
    Entry {
        /// Content type of the entry.
        content_type_uid: String,
    },
    /// Entries of a content type, under `entries`.
    Entries {
        /// Queried content type.
        content_type_uid: String,
    },
    /// One asset, under `asset`.
    Asset,
    /// The asset library, under `assets`.
    Assets,
    /// One content type, under `content_type`.
    ContentType,
    /// Content types, under `content_types`.
    ContentTypes,
    /// One global field, under `global_field`.
    GlobalField,
    /// Global fields, under `global_fields`.
    GlobalFields,
    /// A sync page; read from the top level.
    Sync,
}

impl RequestKind {
    /// Returns the kind answering a query of `target`.
    pub fn for_query(target: &QueryTarget) -> Self {
        match target {
            QueryTarget::Entries { content_type_uid } => RequestKind::Entries {
                content_type_uid: content_type_uid.clone(),
            },
            QueryTarget::Assets => RequestKind::Assets,
            QueryTarget::ContentTypes => RequestKind::ContentTypes,
            QueryTarget::GlobalFields => RequestKind::GlobalFields,
        }
    }

    /// Returns the kind answering a fetch of `target`.
    pub fn for_fetch(target: &FetchTarget) -> Self {
        match target {
            FetchTarget::Entry {
                content_type_uid, ..
            } => RequestKind::Entry {
                content_type_uid: content_type_uid.clone(),
            },
            FetchTarget::Asset { .. } => RequestKind::Asset,
            FetchTarget::ContentType { .. } => RequestKind::ContentType,
            FetchTarget::GlobalField { .. } => RequestKind::GlobalField,
        }
    }

    /// Returns the body key holding the payload, if any.
    pub fn response_key(&self) -> Option<&'static str> {
        match self {
            RequestKind::Entry { .. } => Some("entry"),
            RequestKind::Entries { .. } => Some("entries"),
            RequestKind::Asset => Some("asset"),
            RequestKind::Assets => Some("assets"),
            RequestKind::ContentType => Some("content_type"),
            RequestKind::ContentTypes => Some("content_types"),
            RequestKind::GlobalField => Some("global_field"),
            RequestKind::GlobalFields => Some("global_fields"),
            RequestKind::Sync => None,
        }
    }
}

/// A mapped successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryResponse {
    /// A single entry.
    Entry(Entry),
    /// A page of entries.
    Entries(EntryCollection),
    /// A single asset.
    Asset(Asset),
    /// A page of assets.
    Assets(AssetCollection),
    /// A single content type.
    ContentType(ContentType),
    /// Content types.
    ContentTypes(Vec<ContentType>),
    /// A single global field.
    GlobalField(GlobalField),
    /// Global fields.
    GlobalFields(Vec<GlobalField>),
    /// A sync page.
    Sync(SyncPage),
}

impl DeliveryResponse {
    /// Returns the variant name, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DeliveryResponse::Entry(_) => "entry",
            DeliveryResponse::Entries(_) => "entries",
            DeliveryResponse::Asset(_) => "asset",
            DeliveryResponse::Assets(_) => "assets",
            DeliveryResponse::ContentType(_) => "content_type",
            DeliveryResponse::ContentTypes(_) => "content_types",
            DeliveryResponse::GlobalField(_) => "global_field",
            DeliveryResponse::GlobalFields(_) => "global_fields",
            DeliveryResponse::Sync(_) => "sync",
        }
    }
}

macro_rules! impl_try_from_response {
    ($($variant:ident => $target:ty),* $(,)?) => {
        $(
            impl TryFrom<DeliveryResponse> for $target {
                type Error = DeliveryError;

                fn try_from(response: DeliveryResponse) -> Result<Self, Self::Error> {
                    match response {
                        DeliveryResponse::$variant(value) => Ok(value),
                        other => Err(DeliveryError::decode(format!(
                            "expected {} response, got {}",
                            stringify!($variant),
                            other.kind_name()
                        ))),
                    }
                }
            }
        )*
    };
}

impl_try_from_response! {
    Entry => Entry,
    Entries => EntryCollection,
    Asset => Asset,
    Assets => AssetCollection,
    ContentType => ContentType,
    ContentTypes => Vec<ContentType>,
    GlobalField => GlobalField,
    GlobalFields => Vec<GlobalField>,
    Sync => SyncPage,
}

fn parse_body(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

fn item<'a>(body: &'a Value, key: &str) -> &'a Value {
    body.get(key).unwrap_or(&Value::Null)
}

fn list<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Maps a 2xx body.
///
/// A body that is not JSON, or lacks the expected key, degrades to an
/// empty result of the right kind.
pub fn map_success(kind: &RequestKind, body: &[u8]) -> DeliveryResponse {
    let body = parse_body(body).unwrap_or_else(|| {
        warn!(kind = ?kind, "Response body is not JSON; mapping to defaults");
        Value::Null
    });
    if let Some(key) = kind.response_key() {
        if body.get(key).is_none() {
            warn!(kind = ?kind, key, "Response body lacks expected key; mapping to defaults");
        }
    }

    match kind {
        RequestKind::Entry { content_type_uid } => {
            DeliveryResponse::Entry(Entry::from_value(item(&body, "entry"), Some(content_type_uid)))
        }
        RequestKind::Entries { content_type_uid } => {
            DeliveryResponse::Entries(EntryCollection::from_body(&body, Some(content_type_uid)))
        }
        RequestKind::Asset => DeliveryResponse::Asset(Asset::from_value(item(&body, "asset"))),
        RequestKind::Assets => DeliveryResponse::Assets(AssetCollection::from_body(&body)),
        RequestKind::ContentType => {
            DeliveryResponse::ContentType(ContentType::from_value(item(&body, "content_type")))
        }
        RequestKind::ContentTypes => DeliveryResponse::ContentTypes(
            list(&body, "content_types")
                .iter()
                .map(ContentType::from_value)
                .collect(),
        ),
        RequestKind::GlobalField => {
            DeliveryResponse::GlobalField(GlobalField::from_value(item(&body, "global_field")))
        }
        RequestKind::GlobalFields => DeliveryResponse::GlobalFields(
            list(&body, "global_fields")
                .iter()
                .map(GlobalField::from_value)
                .collect(),
        ),
        RequestKind::Sync => DeliveryResponse::Sync(SyncPage::from_body(&body)),
    }
}

/// Maps a non-2xx response into the uniform error.
///
/// Reads `error_message`, `error_code` and `errors`; each missing part
/// falls back rather than failing.
pub fn map_failure(status: u16, body: &[u8]) -> DeliveryError {
    let body = parse_body(body).unwrap_or(Value::Null);
    let message = body
        .get("error_message")
        .and_then(Value::as_str)
        .map(str::to_string);
    let code = body.get("error_code").and_then(|c| match c {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    });
    let details = body.get("errors").cloned().unwrap_or(Value::Null);
    DeliveryError::service(status, message, code, details)
}

/// Maps a completed exchange.
pub fn map_response(kind: &RequestKind, response: &HttpResponse) -> DeliveryResult<DeliveryResponse> {
    if response.is_success() {
        Ok(map_success(kind, &response.body))
    } else {
        Err(map_failure(response.status, &response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, GENERIC_ERROR_MESSAGE};
    use serde_json::json;

    fn bytes(value: Value) -> Vec<u8> {
        value.to_string().into_bytes()
    }

    #[test]
    fn kinds_from_targets() {
        assert_eq!(
            RequestKind::for_query(&QueryTarget::Entries {
                content_type_uid: "blog".into()
            }),
            RequestKind::Entries {
                content_type_uid: "blog".into()
            }
        );
        assert_eq!(
            RequestKind::for_fetch(&FetchTarget::Asset { uid: "a".into() }),
            RequestKind::Asset
        );
        assert_eq!(RequestKind::Sync.response_key(), None);
        assert_eq!(RequestKind::GlobalFields.response_key(), Some("global_fields"));
    }

    #[test]
    fn each_kind_reads_its_key() {
        let kind = RequestKind::Entry {
            content_type_uid: "blog".into(),
        };
        let entry: Entry = map_success(&kind, &bytes(json!({ "entry": { "uid": "e1" } })))
            .try_into()
            .unwrap();
        assert_eq!(entry.uid, "e1");
        assert_eq!(entry.content_type_uid.as_deref(), Some("blog"));

        let assets: AssetCollection = map_success(
            &RequestKind::Assets,
            &bytes(json!({ "assets": [{ "uid": "a1" }, { "uid": "a2" }], "count": 2 })),
        )
        .try_into()
        .unwrap();
        assert_eq!(assets.assets.len(), 2);
        assert_eq!(assets.count, Some(2));

        let types: Vec<ContentType> = map_success(
            &RequestKind::ContentTypes,
            &bytes(json!({ "content_types": [{ "uid": "blog" }] })),
        )
        .try_into()
        .unwrap();
        assert_eq!(types[0].uid, "blog");

        let field: GlobalField = map_success(
            &RequestKind::GlobalField,
            &bytes(json!({ "global_field": { "uid": "seo" } })),
        )
        .try_into()
        .unwrap();
        assert_eq!(field.uid, "seo");
    }

    #[test]
    fn sync_is_read_from_top_level() {
        let page: SyncPage = map_success(
            &RequestKind::Sync,
            &bytes(json!({ "items": [{ "type": "entry_published" }], "sync_token": "s1" })),
        )
        .try_into()
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.sync_token.as_deref(), Some("s1"));
    }

    #[test]
    fn malformed_success_degrades() {
        let kind = RequestKind::Entries {
            content_type_uid: "blog".into(),
        };
        let collection: EntryCollection = map_success(&kind, b"<html>oops</html>")
            .try_into()
            .unwrap();
        assert!(collection.is_empty());

        let entry: Entry = map_success(
            &RequestKind::Entry {
                content_type_uid: "blog".into(),
            },
            b"",
        )
        .try_into()
        .unwrap();
        assert_eq!(entry.uid, "");
    }

    #[test]
    fn wrong_variant_is_a_decode_error() {
        let response = map_success(&RequestKind::Asset, &bytes(json!({ "asset": {} })));
        let err = Entry::try_from(response).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
        assert!(err.message.contains("asset"));
    }

    #[test]
    fn failure_mapping() {
        let err = map_failure(
            422,
            &bytes(json!({
                "error_message": "Failed to fetch entries.",
                "error_code": 141,
                "errors": { "query": ["is invalid"] }
            })),
        );
        assert_eq!(err.kind, ErrorKind::Service);
        assert_eq!(err.message, "Failed to fetch entries.");
        assert_eq!(err.code, 141);
        assert_eq!(err.status, Some(422));
        assert_eq!(err.details, json!({ "query": ["is invalid"] }));
    }

    #[test]
    fn failure_fallbacks() {
        let err = map_failure(502, b"Bad Gateway");
        assert_eq!(err.message, GENERIC_ERROR_MESSAGE);
        assert_eq!(err.code, 502);
        assert_eq!(err.details, Value::Null);

        let err = map_failure(404, &bytes(json!({ "error_code": "118" })));
        assert_eq!(err.code, 118);
    }

    #[test]
    fn map_response_splits_on_status() {
        let ok = HttpResponse::json(200, &json!({ "assets": [] }));
        assert!(map_response(&RequestKind::Assets, &ok).is_ok());
        let failed = HttpResponse::json(401, &json!({ "error_message": "Bad token" }));
        let err = map_response(&RequestKind::Assets, &failed).unwrap_err();
        assert_eq!(err.message, "Bad token");
        assert_eq!(err.code, 401);
    }
}
