//! Query command implementation.

use super::{build_client, parse_literal, print_json};
use crate::GlobalArgs;
use clap::Args;
use deliverykit_client::EntryCollection;
use deliverykit_query::prelude::*;

/// Arguments of the `query` command.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Content type UID
    pub content_type: String,

    /// Equality predicate as `field=value` (repeatable)
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub conditions: Vec<String>,

    /// Fields to return (repeatable)
    #[arg(long)]
    pub only: Vec<String>,

    /// Fields to leave out (repeatable)
    #[arg(long)]
    pub except: Vec<String>,

    /// Reference fields to resolve (repeatable)
    #[arg(long)]
    pub include: Vec<String>,

    /// Sort ascending by this field
    #[arg(long, conflicts_with = "desc")]
    pub asc: Option<String>,

    /// Sort descending by this field
    #[arg(long)]
    pub desc: Option<String>,

    /// Records to skip
    #[arg(long)]
    pub skip: Option<u32>,

    /// Maximum records to return
    #[arg(long)]
    pub limit: Option<u32>,

    /// Locale to query
    #[arg(long)]
    pub locale: Option<String>,

    /// Include the total match count
    #[arg(long)]
    pub count: bool,

    /// Run the query instead of printing its parameters
    #[arg(long)]
    pub execute: bool,
}

/// Builds the query described by `args`.
pub fn build_query(args: &QueryArgs) -> Result<Query, Box<dyn std::error::Error>> {
    let mut query = Query::entries(args.content_type.clone());

    for condition in &args.conditions {
        let (field, raw) = condition
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got {condition:?}"))?;
        query.where_eq(field, parse_literal(raw))?;
    }
    if !args.only.is_empty() {
        query.only(&args.only)?;
    }
    if !args.except.is_empty() {
        query.except(&args.except)?;
    }
    if !args.include.is_empty() {
        query.include_references(&args.include)?;
    }
    if let Some(field) = &args.asc {
        query.ascending(field)?;
    }
    if let Some(field) = &args.desc {
        query.descending(field)?;
    }
    if let Some(skip) = args.skip {
        query.skip(skip);
    }
    if let Some(limit) = args.limit {
        query.limit(limit);
    }
    if let Some(locale) = &args.locale {
        query.locale(locale.clone());
    }
    if args.count {
        query.include_count();
    }
    Ok(query)
}

/// Runs the query command.
pub async fn run(global: &GlobalArgs, args: &QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let query = build_query(args)?;

    if !args.execute {
        return print_json(&query.compile().to_json());
    }

    let client = build_client(global)?;
    let page: EntryCollection = client.find_as(&query).await?;
    tracing::info!(entries = page.len(), count = ?page.count, "Query completed");
    print_json(&page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(content_type: &str) -> QueryArgs {
        QueryArgs {
            content_type: content_type.to_string(),
            conditions: Vec::new(),
            only: Vec::new(),
            except: Vec::new(),
            include: Vec::new(),
            asc: None,
            desc: None,
            skip: None,
            limit: None,
            locale: None,
            count: false,
            execute: false,
        }
    }

    #[test]
    fn builds_filters_and_pagination() {
        let mut args = args("product");
        args.conditions = vec!["title=Women".into(), "price=20".into()];
        args.desc = Some("created_at".into());
        args.limit = Some(0);
        args.count = true;

        let params = build_query(&args).unwrap().compile();
        assert_eq!(params.get("query"), Some(&json!({ "title": "Women", "price": 20 })));
        assert_eq!(params.get("sort"), Some(&json!({ "created_at": -1 })));
        assert_eq!(params.get("limit"), Some(&json!(0)));
        assert_eq!(params.get("include_count"), Some(&json!(true)));
        assert!(params.get("skip").is_none());
    }

    #[test]
    fn builds_projection_and_references() {
        let mut args = args("product");
        args.only = vec!["title".into(), "price".into()];
        args.except = vec!["price".into()];
        args.include = vec!["author".into()];
        args.locale = Some("fr-fr".into());

        let params = build_query(&args).unwrap().compile();
        assert_eq!(params.get("only[]"), Some(&json!(["title"])));
        assert_eq!(params.get("except[]"), Some(&json!(["price"])));
        assert_eq!(params.get("include[]"), Some(&json!(["author"])));
        assert_eq!(params.get("locale"), Some(&json!("fr-fr")));
    }

    #[test]
    fn rejects_malformed_conditions() {
        let mut bad = args("product");
        bad.conditions = vec!["title".into()];
        assert!(build_query(&bad).is_err());

        let mut bad = args("product");
        bad.conditions = vec!["ti@tle=x".into()];
        assert!(build_query(&bad).is_err());
    }
}
