//! Sync command implementation.

use super::{build_client, print_json};
use crate::GlobalArgs;
use chrono::{DateTime, Utc};
use deliverykit_query::SyncRequest;

/// Builds the sync request from the command-line options.
///
/// A token wins over a pagination token, which wins over a date; with
/// none of them the sync starts from scratch.
pub fn build_request(
    token: Option<String>,
    pagination_token: Option<String>,
    from: Option<DateTime<Utc>>,
    content_type: Option<String>,
    locale: Option<String>,
) -> SyncRequest {
    let mut request = match (token, pagination_token, from) {
        (Some(token), _, _) => SyncRequest::with_token(token),
        (None, Some(token), _) => SyncRequest::with_pagination_token(token),
        (None, None, Some(date)) => SyncRequest::from_date(date),
        (None, None, None) => SyncRequest::init(),
    };
    if let Some(content_type) = content_type {
        request = request.with_content_type(content_type);
    }
    if let Some(locale) = locale {
        request = request.with_locale(locale);
    }
    request
}

/// Runs the sync command.
pub async fn run(
    global: &GlobalArgs,
    request: &SyncRequest,
    all: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = build_client(global)?.sync_manager();

    if all {
        let batch = manager.sync_all(request).await?;
        print_json(&batch)
    } else {
        let page = manager.sync(request).await?;
        if let Some(token) = &page.pagination_token {
            tracing::info!(%token, "More pages remain");
        }
        print_json(&page)
    }
}
