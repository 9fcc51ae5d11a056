//! Query request descriptors.
//!
//! A [`Query`] aggregates a filter tree with projection, sort,
//! pagination, locale, reference inclusion and feature flags. A [`Fetch`]
//! names one record and carries the same options without filtering.
//! Both compile to [`WireParameters`] through a pure `compile()`.

use crate::error::QueryResult;
use crate::field::{validate_all, validate_field_path};
use crate::filter::{FilterTree, Filterable};
use crate::options::{ConfigureRequest, RequestOptions};
use crate::params::WireParameters;
use crate::projection::{Sort, SortDirection};

/// The collection a [`Query`] searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    /// Entries of one content type.
    Entries {
        /// Content type UID.
        content_type_uid: String,
    },
    /// The asset library.
    Assets,
    /// Content type schemas.
    ContentTypes,
    /// Global field schemas.
    GlobalFields,
}

impl QueryTarget {
    /// Returns the request path under `api_version` (for example `v3`).
    pub fn path(&self, api_version: &str) -> String {
        match self {
            QueryTarget::Entries { content_type_uid } => {
                format!("/{api_version}/content_types/{content_type_uid}/entries")
            }
            QueryTarget::Assets => format!("/{api_version}/assets"),
            QueryTarget::ContentTypes => format!("/{api_version}/content_types"),
            QueryTarget::GlobalFields => format!("/{api_version}/global_fields"),
        }
    }
}

/// Skip and limit of a query.
///
/// `skip` of zero is never emitted. `limit` is emitted whenever it was
/// set, including an explicit zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Records to skip.
    pub skip: Option<u32>,
    /// Maximum records to return.
    pub limit: Option<u32>,
}

/// A collection query.
///
/// Configure fully, then hand it to the client. The client compiles the
/// query at dispatch, so later mutation does not affect an in-flight
/// request.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    target: QueryTarget,
    filter: FilterTree,
    options: RequestOptions,
    sort: Option<Sort>,
    pagination: Pagination,
    include_count: bool,
    search: Option<String>,
    tags: Vec<String>,
}

impl Query {
    /// Creates a query over `target`.
    pub fn new(target: QueryTarget) -> Self {
        Self {
            target,
            filter: FilterTree::new(),
            options: RequestOptions::default(),
            sort: None,
            pagination: Pagination::default(),
            include_count: false,
            search: None,
            tags: Vec::new(),
        }
    }

    /// Creates a query over the entries of `content_type_uid`.
    pub fn entries(content_type_uid: impl Into<String>) -> Self {
        Self::new(QueryTarget::Entries {
            content_type_uid: content_type_uid.into(),
        })
    }

    /// Creates a query over the asset library.
    pub fn assets() -> Self {
        Self::new(QueryTarget::Assets)
    }

    /// Creates a query over content types.
    pub fn content_types() -> Self {
        Self::new(QueryTarget::ContentTypes)
    }

    /// Creates a query over global fields.
    pub fn global_fields() -> Self {
        Self::new(QueryTarget::GlobalFields)
    }

    /// Returns the target collection.
    pub fn target(&self) -> &QueryTarget {
        &self.target
    }

    /// Returns the filter tree.
    pub fn filter(&self) -> &FilterTree {
        &self.filter
    }

    /// Returns the shared request options.
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Returns the active sort.
    pub fn active_sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    /// Returns skip and limit.
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Sorts ascending by `field`, replacing any previous sort.
    pub fn ascending(&mut self, field: &str) -> QueryResult<&mut Self> {
        self.set_sort(field, SortDirection::Ascending)
    }

    /// Sorts descending by `field`, replacing any previous sort.
    pub fn descending(&mut self, field: &str) -> QueryResult<&mut Self> {
        self.set_sort(field, SortDirection::Descending)
    }

    fn set_sort(&mut self, field: &str, direction: SortDirection) -> QueryResult<&mut Self> {
        validate_field_path(field)?;
        self.sort = Some(Sort {
            field: field.to_string(),
            direction,
        });
        Ok(self)
    }

    /// Skips the first `skip` records.
    pub fn skip(&mut self, skip: u32) -> &mut Self {
        self.pagination.skip = Some(skip);
        self
    }

    /// Returns at most `limit` records. Zero is forwarded as-is.
    pub fn limit(&mut self, limit: u32) -> &mut Self {
        self.pagination.limit = Some(limit);
        self
    }

    /// Asks for the total match count alongside the page.
    pub fn include_count(&mut self) -> &mut Self {
        self.include_count = true;
        self
    }

    /// Full-text search across the record (`typeahead`).
    pub fn search(&mut self, text: impl Into<String>) -> &mut Self {
        self.search = Some(text.into());
        self
    }

    /// Matches records tagged with any of `tags`.
    pub fn tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Compiles the current state into wire parameters.
    ///
    /// Pure: the descriptor is not modified.
    pub fn compile(&self) -> WireParameters {
        let mut params = WireParameters::new();
        self.options.write_params(&mut params);
        if !self.filter.is_empty() {
            params.insert("query", self.filter.to_json());
        }
        if let Some(sort) = &self.sort {
            params.insert("sort", sort.to_json());
        }
        if let Some(skip) = self.pagination.skip.filter(|s| *s > 0) {
            params.insert("skip", skip);
        }
        if let Some(limit) = self.pagination.limit {
            params.insert("limit", limit);
        }
        if self.include_count {
            params.insert("include_count", true);
        }
        if let Some(search) = &self.search {
            params.insert("typeahead", search.clone());
        }
        if !self.tags.is_empty() {
            params.insert("tags", self.tags.join(","));
        }
        params
    }
}

impl Filterable for Query {
    fn filter_tree_mut(&mut self) -> &mut FilterTree {
        &mut self.filter
    }
}

impl ConfigureRequest for Query {
    fn options_mut(&mut self) -> &mut RequestOptions {
        &mut self.options
    }
}

/// The single record a [`Fetch`] retrieves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    /// One entry.
    Entry {
        /// Content type UID.
        content_type_uid: String,
        /// Entry UID.
        entry_uid: String,
    },
    /// One asset.
    Asset {
        /// Asset UID.
        uid: String,
    },
    /// One content type schema.
    ContentType {
        /// Content type UID.
        uid: String,
    },
    /// One global field schema.
    GlobalField {
        /// Global field UID.
        uid: String,
    },
}

impl FetchTarget {
    /// Returns the request path under `api_version`.
    pub fn path(&self, api_version: &str) -> String {
        match self {
            FetchTarget::Entry {
                content_type_uid,
                entry_uid,
            } => format!("/{api_version}/content_types/{content_type_uid}/entries/{entry_uid}"),
            FetchTarget::Asset { uid } => format!("/{api_version}/assets/{uid}"),
            FetchTarget::ContentType { uid } => format!("/{api_version}/content_types/{uid}"),
            FetchTarget::GlobalField { uid } => format!("/{api_version}/global_fields/{uid}"),
        }
    }
}

/// A single-record fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetch {
    target: FetchTarget,
    options: RequestOptions,
    detail_flags: Vec<String>,
}

impl Fetch {
    /// Creates a fetch of `target`.
    pub fn new(target: FetchTarget) -> Self {
        Self {
            target,
            options: RequestOptions::default(),
            detail_flags: Vec::new(),
        }
    }

    /// Fetches entry `entry_uid` of `content_type_uid`.
    pub fn entry(content_type_uid: impl Into<String>, entry_uid: impl Into<String>) -> Self {
        Self::new(FetchTarget::Entry {
            content_type_uid: content_type_uid.into(),
            entry_uid: entry_uid.into(),
        })
    }

    /// Fetches asset `uid`.
    pub fn asset(uid: impl Into<String>) -> Self {
        Self::new(FetchTarget::Asset { uid: uid.into() })
    }

    /// Fetches content type `uid`.
    pub fn content_type(uid: impl Into<String>) -> Self {
        Self::new(FetchTarget::ContentType { uid: uid.into() })
    }

    /// Fetches global field `uid`.
    pub fn global_field(uid: impl Into<String>) -> Self {
        Self::new(FetchTarget::GlobalField { uid: uid.into() })
    }

    /// Returns the target record.
    pub fn target(&self) -> &FetchTarget {
        &self.target
    }

    /// Returns the shared request options.
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Turns on per-record detail flags such as `include_dimension` or
    /// `relative_urls`.
    pub fn include_details<I, S>(&mut self, flags: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.detail_flags.extend(validate_all(flags)?);
        Ok(self)
    }

    /// Compiles the current state into wire parameters.
    pub fn compile(&self) -> WireParameters {
        let mut params = WireParameters::new();
        self.options.write_params(&mut params);
        for flag in &self.detail_flags {
            params.insert(flag.clone(), true);
        }
        params
    }
}

impl ConfigureRequest for Fetch {
    fn options_mut(&mut self) -> &mut RequestOptions {
        &mut self.options
    }
}
