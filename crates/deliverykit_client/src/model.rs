//! Domain results mapped from delivery responses.
//!
//! Mapping never fails on a missing or mistyped field; the field degrades
//! to `None`, an empty string or an empty collection. The full payload of
//! every record stays reachable through its [`FieldMap`].

use chrono::{DateTime, Utc};
use deliverykit_query::SyncCursor;
use serde::Serialize;
use serde_json::{Map, Value};

/// String-keyed map of raw field values with typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldMap(Map<String, Value>);

impl FieldMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from a JSON object; anything else yields an empty map.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self(map.clone()),
            _ => Self::default(),
        }
    }

    /// Returns the value of a top-level field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Resolves a dotted path such as `seo.title` or `tags.0`.
    ///
    /// Numeric segments index into arrays.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns a string field.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get_path(path).and_then(Value::as_str)
    }

    /// Returns an integer field.
    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get_path(path).and_then(Value::as_i64)
    }

    /// Returns a float field (integers widen).
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get_path(path).and_then(Value::as_f64)
    }

    /// Returns a boolean field.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get_path(path).and_then(Value::as_bool)
    }

    /// Returns an RFC 3339 timestamp field.
    pub fn get_datetime(&self, path: &str) -> Option<DateTime<Utc>> {
        self.get_str(path)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    /// Returns true if the top-level field is present.
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the number of top-level fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the top-level fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn string_or_empty(fields: &FieldMap, name: &str) -> String {
    fields.get_str(name).unwrap_or_default().to_string()
}

fn owned_str(fields: &FieldMap, name: &str) -> Option<String> {
    fields.get_str(name).map(str::to_string)
}

fn count_of(body: &Value) -> Option<u64> {
    body.get("count").and_then(Value::as_u64)
}

fn array_of<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// A published entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Entry {
    /// Entry UID.
    pub uid: String,
    /// Content type the entry belongs to, when known.
    pub content_type_uid: Option<String>,
    /// Entry title.
    pub title: Option<String>,
    /// Locale of the returned version.
    pub locale: Option<String>,
    /// Version number.
    pub version: Option<i64>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Every field of the entry.
    pub fields: FieldMap,
}

impl Entry {
    /// Maps an entry object.
    pub fn from_value(value: &Value, content_type_uid: Option<&str>) -> Self {
        let fields = FieldMap::from_value(value);
        Self {
            uid: string_or_empty(&fields, "uid"),
            content_type_uid: content_type_uid
                .map(str::to_string)
                .or_else(|| owned_str(&fields, "_content_type_uid")),
            title: owned_str(&fields, "title"),
            locale: owned_str(&fields, "locale"),
            version: fields.get_i64("_version"),
            updated_at: fields.get_datetime("updated_at"),
            fields,
        }
    }

    /// Returns a field by dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.get_path(path)
    }
}

/// Entries returned by a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntryCollection {
    /// Matching entries in service order.
    pub entries: Vec<Entry>,
    /// Total match count, when requested.
    pub count: Option<u64>,
    /// Schema of the queried content type, when requested.
    pub content_type: Option<ContentType>,
}

impl EntryCollection {
    /// Maps a `{ "entries": [...] }` body.
    pub fn from_body(body: &Value, content_type_uid: Option<&str>) -> Self {
        Self {
            entries: array_of(body, "entries")
                .iter()
                .map(|v| Entry::from_value(v, content_type_uid))
                .collect(),
            count: count_of(body),
            content_type: body.get("content_type").map(ContentType::from_value),
        }
    }

    /// Returns the number of entries in this page.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A published asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Asset {
    /// Asset UID.
    pub uid: String,
    /// Asset title.
    pub title: Option<String>,
    /// File name.
    pub filename: Option<String>,
    /// Delivery URL.
    pub url: Option<String>,
    /// MIME type.
    pub content_type: Option<String>,
    /// Size in bytes.
    pub file_size: Option<u64>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Every field of the asset.
    pub fields: FieldMap,
}

impl Asset {
    /// Maps an asset object.
    pub fn from_value(value: &Value) -> Self {
        let fields = FieldMap::from_value(value);
        // file_size arrives as a string on some stacks
        let file_size = match fields.get("file_size") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        Self {
            uid: string_or_empty(&fields, "uid"),
            title: owned_str(&fields, "title"),
            filename: owned_str(&fields, "filename"),
            url: owned_str(&fields, "url"),
            content_type: owned_str(&fields, "content_type"),
            file_size,
            updated_at: fields.get_datetime("updated_at"),
            fields,
        }
    }

    /// Returns a field by dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.get_path(path)
    }
}

/// Assets returned by an asset-library query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetCollection {
    /// Matching assets in service order.
    pub assets: Vec<Asset>,
    /// Total match count, when requested.
    pub count: Option<u64>,
}

impl AssetCollection {
    /// Maps an `{ "assets": [...] }` body.
    pub fn from_body(body: &Value) -> Self {
        Self {
            assets: array_of(body, "assets").iter().map(Asset::from_value).collect(),
            count: count_of(body),
        }
    }
}

/// A content type schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentType {
    /// Content type UID.
    pub uid: String,
    /// Display title.
    pub title: Option<String>,
    /// Field definitions.
    pub schema: Vec<Value>,
    /// Every attribute of the content type.
    pub fields: FieldMap,
}

impl ContentType {
    /// Maps a content type object.
    pub fn from_value(value: &Value) -> Self {
        let fields = FieldMap::from_value(value);
        Self {
            uid: string_or_empty(&fields, "uid"),
            title: owned_str(&fields, "title"),
            schema: array_of(value, "schema").to_vec(),
            fields,
        }
    }
}

/// A reusable global field schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalField {
    /// Global field UID.
    pub uid: String,
    /// Display title.
    pub title: Option<String>,
    /// Field definitions.
    pub schema: Vec<Value>,
    /// Every attribute of the global field.
    pub fields: FieldMap,
}

impl GlobalField {
    /// Maps a global field object.
    pub fn from_value(value: &Value) -> Self {
        let fields = FieldMap::from_value(value);
        Self {
            uid: string_or_empty(&fields, "uid"),
            title: owned_str(&fields, "title"),
            schema: array_of(value, "schema").to_vec(),
            fields,
        }
    }
}

/// One change reported by a sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncItem {
    /// Event type, such as `entry_published`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Content type of the changed entry.
    pub content_type_uid: Option<String>,
    /// When the event happened.
    pub event_at: Option<DateTime<Utc>>,
    /// The changed record.
    pub data: FieldMap,
}

impl SyncItem {
    /// Maps a sync item object.
    pub fn from_value(value: &Value) -> Self {
        let fields = FieldMap::from_value(value);
        Self {
            kind: string_or_empty(&fields, "type"),
            content_type_uid: owned_str(&fields, "content_type_uid"),
            event_at: fields.get_datetime("event_at"),
            data: fields
                .get("data")
                .map(FieldMap::from_value)
                .unwrap_or_default(),
        }
    }

    /// Returns the UID of the changed record.
    pub fn uid(&self) -> Option<&str> {
        self.data.get_str("uid")
    }
}

/// One page of sync results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncPage {
    /// Changes in this page.
    pub items: Vec<SyncItem>,
    /// Token for the next incremental sync, once the batch is drained.
    pub sync_token: Option<String>,
    /// Token for the next page of this batch.
    pub pagination_token: Option<String>,
    /// Offset of this page within the batch.
    pub skip: u64,
    /// Page size.
    pub limit: u64,
    /// Items in the whole batch.
    pub total_count: u64,
}

impl SyncPage {
    /// Maps a sync body.
    pub fn from_body(body: &Value) -> Self {
        let items: Vec<SyncItem> = array_of(body, "items")
            .iter()
            .map(SyncItem::from_value)
            .collect();
        let number = |key: &str| body.get(key).and_then(Value::as_u64);
        let token = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        };
        Self {
            total_count: number("total_count").unwrap_or(items.len() as u64),
            skip: number("skip").unwrap_or_default(),
            limit: number("limit").unwrap_or_default(),
            sync_token: token("sync_token"),
            pagination_token: token("pagination_token"),
            items,
        }
    }

    /// Returns the continuation cursor of this page.
    pub fn cursor(&self) -> SyncCursor {
        SyncCursor {
            sync_token: self.sync_token.clone(),
            pagination_token: self.pagination_token.clone(),
            item_count: self.total_count,
        }
    }
}
