//! Schema and document migrations.
//!
//! Two things are versioned independently:
//! - the SQLite schema, tracked in the `schema_version` table
//! - the persisted state document, tracked in its top-level `version` field
//!
//! Both are migrated forward step by step when opened or loaded.

use rusqlite::{Connection, Result as SqliteResult};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::StorageError;

/// Current SQLite schema version.
///
/// Increment this when adding new schema migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Current persisted-document version.
pub const STATE_VERSION: u32 = 1;

/// Apply all pending schema migrations.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: key-value table holding the state document.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Bring a decoded state document up to [`STATE_VERSION`].
///
/// A missing or non-numeric `version` counts as 0.
///
/// # Errors
/// Returns [`StorageError::UnsupportedVersion`] for documents written by a
/// newer build, and [`StorageError::QueryFailed`] if the document is not
/// a JSON object.
pub fn migrate_state(mut document: Value) -> Result<Value, StorageError> {
    let from = document
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);

    if from > STATE_VERSION {
        return Err(StorageError::UnsupportedVersion {
            from,
            current: STATE_VERSION,
        });
    }
    if !document.is_object() {
        return Err(StorageError::QueryFailed(
            "persisted state is not an object".into(),
        ));
    }

    for version in from + 1..=STATE_VERSION {
        document = match version {
            1 => migrate_state_v1(document),
            _ => document,
        };
        if let Some(obj) = document.as_object_mut() {
            obj.insert("version".into(), Value::from(version));
        }
        info!(version, "migrated persisted state");
    }

    Ok(document)
}

/// v0 -> v1: unversioned documents only gain the version stamp.
fn migrate_state_v1(document: Value) -> Value {
    document
}
