//! Schema versioning for the store database.
//!
//! Only the `SQLite` table layout is versioned. The JSON blobs stored under
//! each key carry no version of their own.

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Metadata key holding the schema version.
const VERSION_KEY: &str = "schema_version";

/// Ordered upgrade steps. Entry `n` upgrades from version `n` to `n + 1`.
const UPGRADES: &[&str] = &[
    // 0 -> 1: the base tables from `SCHEMA_STATEMENTS` are the whole schema.
    "",
];

/// Create the base tables and bring the schema up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if the stored version is unreadable, newer than this
/// build understands, or if an upgrade statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let mut version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::StoreMigration {
            message: format!(
                "store schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    while version < CURRENT_VERSION {
        let step = usize::try_from(version).map_err(|_| Error::StoreMigration {
            message: format!("negative schema version: {version}"),
        })?;
        let sql = UPGRADES.get(step).ok_or_else(|| Error::StoreMigration {
            message: format!("no upgrade from schema version {version}"),
        })?;
        if !sql.is_empty() {
            conn.execute_batch(sql)?;
        }
        version += 1;
        debug!("Store schema upgraded to version {}", version);
    }

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Read the schema version, treating a missing row as version 0.
pub(crate) fn schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::StoreMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}
