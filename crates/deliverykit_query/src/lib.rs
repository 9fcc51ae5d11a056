//! # DeliveryKit Query
//!
//! Query descriptors and wire-parameter compilation for headless CMS
//! content-delivery APIs.
//!
//! This crate provides:
//! - `FilterTree` and the `Filterable` predicate builder
//! - `Projection` (`only` / `except`, optionally reference-scoped) and `Sort`
//! - `Query` and `Fetch` request descriptors
//! - `SyncRequest` and `SyncCursor` for incremental synchronization
//! - `WireParameters`, the compiled form sent to the service
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ```
//! use deliverykit_query::prelude::*;
//!
//! # fn main() -> QueryResult<()> {
//! let mut query = Query::entries("product");
//! query
//!     .where_eq("title", "Women")?
//!     .only(["title", "price"])?
//!     .include_reference("categories")?
//!     .limit(10);
//!
//! let params = query.compile();
//! assert!(params.contains_key("query"));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod field;
mod filter;
mod options;
mod params;
mod projection;
mod query;
mod sync;
mod value;

pub use error::{QueryError, QueryResult};
pub use field::validate_field_path;
pub use filter::{Combinator, FilterTree, Filterable, Operator};
pub use options::{ConfigureRequest, RequestOptions, RAW_INCLUDE_SCHEMA};
pub use params::WireParameters;
pub use projection::{Projection, Sort, SortDirection, BASE_SCOPE};
pub use query::{Fetch, FetchTarget, Pagination, Query, QueryTarget};
pub use sync::{PublishType, SyncContinuation, SyncCursor, SyncRequest, SyncStart};
pub use value::Scalar;

/// Convenient imports for building requests.
pub mod prelude {
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{FilterTree, Filterable};
    pub use crate::options::ConfigureRequest;
    pub use crate::query::{Fetch, Query};
    pub use crate::sync::SyncRequest;
}
