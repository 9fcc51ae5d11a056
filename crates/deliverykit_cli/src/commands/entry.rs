//! Entry command implementation.

use super::{build_client, print_json};
use crate::GlobalArgs;
use deliverykit_client::Entry;
use deliverykit_query::prelude::*;

/// Builds the fetch for one entry.
pub fn build_fetch(
    content_type: &str,
    uid: &str,
    locale: Option<String>,
    include: &[String],
) -> QueryResult<Fetch> {
    let mut fetch = Fetch::entry(content_type, uid);
    if let Some(locale) = locale {
        fetch.locale(locale);
    }
    if !include.is_empty() {
        fetch.include_references(include)?;
    }
    Ok(fetch)
}

/// Runs the entry command.
pub async fn run(
    global: &GlobalArgs,
    content_type: &str,
    uid: &str,
    locale: Option<String>,
    include: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let fetch = build_fetch(content_type, uid, locale, include)?;
    let client = build_client(global)?;
    let entry: Entry = client.fetch_as(&fetch).await?;
    print_json(&entry)
}
