//! Catalog importer library for copying anime metadata from the samehadaku
//! catalog API into the local catalog database.
//!
//! This library provides the HTTP client (with request limiting and 429
//! retry), the field parsers and the import orchestrator.

pub mod api;
pub mod error;
pub mod importer;
pub mod parse;

pub use api::{CatalogSource, RateLimiter, RetryPolicy, SamehadakuClient};
pub use error::{ImportError, RemoteError};
pub use importer::{ImportSummary, Importer, Pacing};
