//! Sync requests and continuation cursors.

use crate::params::WireParameters;
use chrono::{DateTime, SecondsFormat, Utc};

/// Where a sync request starts. The variants are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStart {
    /// A fresh, full sync (`init=true`).
    Init,
    /// Resume from a previously issued sync token (`sync_token`).
    Token(String),
    /// Next page of an in-progress batch (`pagination_token`).
    PaginationToken(String),
    /// A fresh sync bounded to changes after a point in time (`start_from`).
    FromDate(DateTime<Utc>),
}

/// Publish event types a fresh sync can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishType {
    /// `entry_published`
    EntryPublished,
    /// `entry_unpublished`
    EntryUnpublished,
    /// `entry_deleted`
    EntryDeleted,
    /// `asset_published`
    AssetPublished,
    /// `asset_unpublished`
    AssetUnpublished,
    /// `asset_deleted`
    AssetDeleted,
    /// `content_type_deleted`
    ContentTypeDeleted,
}

impl PublishType {
    /// Returns the wire value of this publish type.
    pub fn wire_value(&self) -> &'static str {
        match self {
            PublishType::EntryPublished => "entry_published",
            PublishType::EntryUnpublished => "entry_unpublished",
            PublishType::EntryDeleted => "entry_deleted",
            PublishType::AssetPublished => "asset_published",
            PublishType::AssetUnpublished => "asset_unpublished",
            PublishType::AssetDeleted => "asset_deleted",
            PublishType::ContentTypeDeleted => "content_type_deleted",
        }
    }
}

/// A sync request.
///
/// Tokens are opaque and forwarded without client-side validation; an
/// unknown token comes back as a service error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    start: SyncStart,
    content_type_uid: Option<String>,
    locale: Option<String>,
    publish_type: Option<PublishType>,
}

impl SyncRequest {
    fn new(start: SyncStart) -> Self {
        Self {
            start,
            content_type_uid: None,
            locale: None,
            publish_type: None,
        }
    }

    /// A fresh, full sync.
    pub fn init() -> Self {
        Self::new(SyncStart::Init)
    }

    /// Resumes with a sync token from an earlier, exhausted batch.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(SyncStart::Token(token.into()))
    }

    /// Continues an in-progress batch with its pagination token.
    pub fn with_pagination_token(token: impl Into<String>) -> Self {
        Self::new(SyncStart::PaginationToken(token.into()))
    }

    /// A fresh sync of changes after `date`.
    pub fn from_date(date: DateTime<Utc>) -> Self {
        Self::new(SyncStart::FromDate(date))
    }

    /// Narrows a fresh sync to one content type.
    pub fn with_content_type(mut self, content_type_uid: impl Into<String>) -> Self {
        self.content_type_uid = Some(content_type_uid.into());
        self
    }

    /// Narrows a fresh sync to one locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Narrows a fresh sync to one publish event type.
    pub fn with_publish_type(mut self, publish_type: PublishType) -> Self {
        self.publish_type = Some(publish_type);
        self
    }

    /// Returns the starting point.
    pub fn start(&self) -> &SyncStart {
        &self.start
    }

    /// Returns the request path under `api_version`.
    pub fn path(api_version: &str) -> String {
        format!("/{api_version}/stacks/sync")
    }

    /// Compiles the request into wire parameters.
    ///
    /// Narrowing filters only apply to fresh syncs and are dropped when
    /// continuing from a token.
    pub fn compile(&self) -> WireParameters {
        let mut params = WireParameters::new();
        let fresh = match &self.start {
            SyncStart::Init => {
                params.insert("init", true);
                true
            }
            SyncStart::Token(token) => {
                params.insert("sync_token", token.clone());
                false
            }
            SyncStart::PaginationToken(token) => {
                params.insert("pagination_token", token.clone());
                false
            }
            SyncStart::FromDate(date) => {
                params.insert(
                    "start_from",
                    date.to_rfc3339_opts(SecondsFormat::Millis, true),
                );
                true
            }
        };
        if fresh {
            if let Some(uid) = &self.content_type_uid {
                params.insert("content_type_uid", uid.clone());
            }
            if let Some(locale) = &self.locale {
                params.insert("locale", locale.clone());
            }
            if let Some(publish_type) = self.publish_type {
                params.insert("type", publish_type.wire_value());
            }
        }
        params
    }
}

/// What to do after a sync response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncContinuation {
    /// More pages remain in this batch; request them with this token.
    NextPage(String),
    /// The batch is exhausted; keep this token for the next incremental sync.
    Resume(String),
    /// Neither token was issued; the result cannot be resumed.
    Drained,
}

/// Cursor tokens returned with a sync page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncCursor {
    /// Token for the next incremental sync.
    pub sync_token: Option<String>,
    /// Token for the next page of the current batch.
    pub pagination_token: Option<String>,
    /// Items reported for the batch.
    pub item_count: u64,
}

impl SyncCursor {
    /// Decides how to continue. A pagination token takes precedence.
    pub fn continuation(&self) -> SyncContinuation {
        match (&self.pagination_token, &self.sync_token) {
            (Some(page), _) => SyncContinuation::NextPage(page.clone()),
            (None, Some(sync)) => SyncContinuation::Resume(sync.clone()),
            (None, None) => SyncContinuation::Drained,
        }
    }

    /// Returns true if more pages remain in this batch.
    pub fn has_more_pages(&self) -> bool {
        self.pagination_token.is_some()
    }

    /// Builds the request that continues from this cursor.
    pub fn next_request(&self) -> Option<SyncRequest> {
        match self.continuation() {
            SyncContinuation::NextPage(token) => Some(SyncRequest::with_pagination_token(token)),
            SyncContinuation::Resume(token) => Some(SyncRequest::with_token(token)),
            SyncContinuation::Drained => None,
        }
    }
}
