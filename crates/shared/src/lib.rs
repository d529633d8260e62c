//! Shared library for the anime catalog.
//!
//! This crate provides common functionality used by the importer and the
//! dashboard queries:
//! - Configuration management
//! - Database connection and schema
//! - Catalog models and repository
//! - Logging infrastructure
//! - Shared error types

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{ConfigError, PersistenceError};
pub use logging::LogConfig;
pub use models::*;
pub use repository::{CatalogRepository, SqliteCatalog};

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
