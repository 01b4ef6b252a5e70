//! SQLite-backed state store.
//!
//! Holds the app state document in a small key-value table so the file
//! can later carry other keyed blobs without a schema change.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations, StateStore};
use crate::error::StorageError;

/// Key of the persisted app state document.
pub const STATE_KEY: &str = "app_state";

/// SQLite database for the persisted state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pomoflow/pomoflow.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(&data_dir()?.join("pomoflow.db"))
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        migrations::migrate(&db.conn)?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        let db = Self { conn };
        migrations::migrate(&db.conn)?;
        Ok(db)
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// # Errors
    /// Returns an error if the insert fails.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the delete fails.
    pub fn kv_delete(&self, key: &str) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}

impl StateStore for Database {
    fn load_raw(&self) -> Result<Option<String>, StorageError> {
        self.kv_get(STATE_KEY)
    }

    fn save_raw(&self, document: &str) -> Result<(), StorageError> {
        self.kv_set(STATE_KEY, document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_roundtrip() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.kv_get("missing").unwrap(), None);

        db.kv_set("k", "v1").unwrap();
        db.kv_set("k", "v2").unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v2"));

        assert!(db.kv_delete("k").unwrap());
        assert!(!db.kv_delete("k").unwrap());
        assert_eq!(db.kv_get("k").unwrap(), None);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pomoflow.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.save_raw("{\"version\":1}").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.load_raw().unwrap().as_deref(), Some("{\"version\":1}"));
    }
}
