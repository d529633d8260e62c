//! Error types shared by the catalog crates.

use thiserror::Error;

/// Failure reported by the catalog store
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A unique or primary key constraint rejected the write
    #[error("duplicate key while trying to {operation}")]
    DuplicateKey { operation: &'static str },

    #[error("failed to {operation}: {source}")]
    Sqlite {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl PersistenceError {
    /// Classify a rusqlite error raised while performing `operation`
    pub fn from_sqlite(operation: &'static str, source: rusqlite::Error) -> Self {
        if is_duplicate_key(&source) {
            Self::DuplicateKey { operation }
        } else {
            Self::Sqlite { operation, source }
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

/// Whether the error is a UNIQUE or PRIMARY KEY violation.
///
/// Foreign key and CHECK violations share the constraint error code but do
/// not count.
pub fn is_duplicate_key(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ),
        _ => false,
    }
}

/// Invalid or incomplete startup configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("database URL is not configured (set database.url or ANIME_CATALOG_DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("unsupported database URL '{0}': only sqlite:// locations are supported")]
    InvalidDatabaseUrl(String),

    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
}
