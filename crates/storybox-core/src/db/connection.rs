//! Database connection management

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use super::migrations;
use crate::error::{Error, Result};

/// Owned SQLite connection with the storybox schema applied
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
    /// Set when a transaction guard was dropped without finishing
    pub(super) pending_rollback: bool,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically. Any failure is reported as
    /// [`Error::StorageUnavailable`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::open_inner(path).map_err(|error| match error {
            Error::StorageUnavailable(_) => error,
            other => Error::StorageUnavailable(format!("{}: {other}", path.display())),
        })
    }

    fn open_inner(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let mut database = Self {
            conn,
            path: Some(path.to_path_buf()),
            pending_rollback: false,
        };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|error| Error::StorageUnavailable(error.to_string()))?;
        let mut database = Self {
            conn,
            path: None,
            pending_rollback: false,
        };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases
        self.conn.pragma_update(None, "journal_mode", "WAL").ok();
        self.conn.pragma_update(None, "synchronous", "NORMAL").ok();
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    }

    /// Run database migrations
    fn migrate(&mut self) -> Result<()> {
        migrations::run(&mut self.conn)
    }

    /// Schema version currently applied
    pub fn schema_version(&self) -> Result<i32> {
        migrations::get_version(&self.conn)
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Roll back a transaction abandoned by a dropped guard.
    pub(super) fn recover(&mut self) {
        if self.pending_rollback {
            if let Err(error) = self.conn.execute_batch("ROLLBACK") {
                tracing::debug!("No transaction to roll back: {}", error);
            }
            self.pending_rollback = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.path().is_none());
        assert_eq!(db.schema_version().unwrap(), migrations::CURRENT_VERSION);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("storybox.db");

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.path(), Some(db_path.as_path()));
        assert!(db_path.exists());
    }

    #[test]
    fn test_open_garbage_file_is_storage_unavailable() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("storybox.db");
        std::fs::write(&db_path, vec![b'x'; 4096]).unwrap();

        let error = Database::open(&db_path).err().unwrap();
        assert!(matches!(error, Error::StorageUnavailable(_)));
    }
}
