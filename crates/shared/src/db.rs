//! Database operations for SQLite.
//!
//! This module handles the catalog store connection, schema creation, and migrations.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Current schema version, stored in the `user_version` pragma
pub const SCHEMA_VERSION: i32 = 1;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_new = !path.exists();

        debug!(path = %path.display(), "Opening database");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        Self::init(conn, is_new)
    }

    /// Open a private in-memory database with the full schema
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn, true)
    }

    fn init(conn: Connection, is_new: bool) -> Result<Self> {
        // Enable foreign keys
        conn.execute("PRAGMA foreign_keys = ON", [])
            .context("Failed to enable foreign keys")?;

        let mut db = Self { conn };

        if is_new {
            info!("Creating new database schema");
            db.create_schema()?;
        } else {
            debug!("Database already exists");
            db.run_migrations()?;
        }

        Ok(db)
    }

    /// Create the database schema
    fn create_schema(&mut self) -> Result<()> {
        self.conn
            .execute_batch(include_str!("../schema.sql"))
            .context("Failed to create database schema")?;
        self.set_version(SCHEMA_VERSION)?;

        info!(version = SCHEMA_VERSION, "Database schema created successfully");
        Ok(())
    }

    /// Get a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get a mutable reference to the underlying connection
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Get the database version (from user_version pragma)
    pub fn get_version(&self) -> Result<i32> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Set the database version
    pub fn set_version(&self, version: i32) -> Result<()> {
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {}", version))?;
        Ok(())
    }

    /// Run migrations for existing databases
    ///
    /// Files created by an older build, or an empty file created externally,
    /// are brought up to the current schema. All statements are idempotent.
    fn run_migrations(&mut self) -> Result<()> {
        let version = self.get_version()?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }

        info!(from = version, to = SCHEMA_VERSION, "Running schema migration");
        self.conn
            .execute_batch(include_str!("../schema.sql"))
            .context("Failed to migrate database schema")?;
        self.set_version(SCHEMA_VERSION)?;
        info!("Migration completed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn has_table(db: &Database, table: &str) -> Result<bool> {
        let count: i64 = db.conn().query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[test]
    fn test_create_database() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open(&db_path)?;
        assert!(db_path.exists());

        for table in [
            "anime",
            "genre",
            "anime_genre",
            "episode",
            "video_quality",
            "video_server",
        ] {
            assert!(has_table(&db, table)?, "missing table {table}");
        }

        Ok(())
    }

    #[test]
    fn test_version() -> Result<()> {
        let db = Database::open_in_memory()?;
        assert_eq!(db.get_version()?, SCHEMA_VERSION);

        db.set_version(7)?;
        assert_eq!(db.get_version()?, 7);

        Ok(())
    }

    #[test]
    fn test_migrates_empty_existing_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("nested").join("catalog.db");

        // An existing database without any tables
        std::fs::create_dir_all(db_path.parent().unwrap())?;
        Connection::open(&db_path)?;

        let db = Database::open(&db_path)?;
        assert!(has_table(&db, "video_server")?);
        assert_eq!(db.get_version()?, SCHEMA_VERSION);

        Ok(())
    }

    #[test]
    fn test_reopen_keeps_data() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("catalog.db");

        {
            let db = Database::open(&db_path)?;
            db.conn().execute("INSERT INTO genre (name) VALUES ('Action')", [])?;
        }

        let db = Database::open(&db_path)?;
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM genre", [], |row| row.get(0))?;
        assert_eq!(count, 1);

        Ok(())
    }
}
