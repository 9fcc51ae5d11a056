//! # DeliveryKit Testkit
//!
//! Test utilities for DeliveryKit.
//!
//! This crate provides:
//! - JSON fixtures and client helpers
//! - An in-memory delivery service implementing the transport seam
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use deliverykit_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn finds_entries() {
//!     let server = FakeDeliveryServer::new();
//!     server.add_entry("product", entry_json("e1", "Women"));
//!     let client = test_client(server);
//!     // ... dispatch queries
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fake_server;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fake_server::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fake_server::*;
pub use fixtures::*;
pub use generators::*;
