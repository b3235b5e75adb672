//! Storage adapter for shoresquad.
//!
//! A small key-value store on top of `SQLite`. Every value is a JSON document
//! stored as text under a string key, one independent blob per key.
//!
//! `save` and `load` never raise: a failed write, a failed read and a blob
//! that no longer parses are logged and reported as "no data". Callers treat
//! absence and failure the same way.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// Keys of the blobs written by the application.
pub mod keys {
    /// The crew collection.
    pub const CREWS: &str = "shoresquad_crew";
    /// The cleanup event collection.
    pub const EVENTS: &str = "shoresquad_events";
    /// The last known location.
    pub const LOCATION: &str = "shoresquad_location";
}

/// Path reported for in-memory stores.
const MEMORY_PATH: &str = ":memory:";

/// Key-value store for application records.
#[derive(Debug)]
pub struct Store {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening store at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::StoreOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Store opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store. Nothing survives the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::StoreOpen {
            path: PathBuf::from(MEMORY_PATH),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(MEMORY_PATH),
            conn,
        })
    }

    /// Open the store at `path`, falling back to an in-memory store when the
    /// file cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error only if the in-memory fallback also fails.
    pub fn open_or_memory(path: impl AsRef<Path>) -> Result<Self> {
        match Self::open(&path) {
            Ok(store) => Ok(store),
            Err(e) => {
                warn!(
                    "Store at {} unavailable ({e}); changes will not be kept",
                    path.as_ref().display()
                );
                Self::open_in_memory()
            }
        }
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this store lives only in memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    /// Serialize `value` to JSON and write it under `key`.
    ///
    /// Returns `false` if serialization or the write failed; the failure is logged.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                error!(key, "Failed to serialize value: {e}");
                return false;
            }
        };

        match self.put_raw(key, &text) {
            Ok(()) => {
                debug!(key, bytes = text.len(), "Saved");
                true
            }
            Err(e) => {
                error!(key, "Failed to write to store: {e}");
                false
            }
        }
    }

    /// Read the JSON stored under `key` and deserialize it.
    ///
    /// Returns `None` if the key is missing, the read failed, or the stored
    /// text does not parse as `T`.
    #[must_use]
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = match self.get_raw(key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                error!(key, "Failed to read from store: {e}");
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, "Ignoring unreadable stored value: {e}");
                None
            }
        }
    }

    /// Remove the blob under `key`. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> bool {
        match self.conn.execute("DELETE FROM entries WHERE key = ?1", [key]) {
            Ok(rows) => rows > 0,
            Err(e) => {
                error!(key, "Failed to remove from store: {e}");
                false
            }
        }
    }

    /// Remove every blob. Returns how many were removed.
    pub fn clear(&self) -> usize {
        match self.conn.execute("DELETE FROM entries", []) {
            Ok(rows) => {
                info!("Cleared {} stored entries", rows);
                rows
            }
            Err(e) => {
                error!("Failed to clear store: {e}");
                0
            }
        }
    }

    /// List the stored keys in alphabetical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM entries ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let (entries, value_bytes): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(value)), 0) FROM entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let db_size_bytes = if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            entries: u64::try_from(entries).unwrap_or(0),
            value_bytes: u64::try_from(value_bytes).unwrap_or(0),
            db_size_bytes,
        })
    }

    fn put_raw(&self, key: &str, text: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, text, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let text = self
            .conn
            .query_row("SELECT value FROM entries WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(text)
    }
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of stored blobs.
    pub entries: u64,
    /// Total length of the stored JSON text.
    pub value_bytes: u64,
    /// Size of the database file in bytes (0 for in-memory stores).
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        tags: Vec<String>,
    }

    fn create_test_store() -> Store {
        Store::open_in_memory().expect("failed to create test store")
    }

    fn sample(name: &str) -> Sample {
        Sample {
            name: name.to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[test]
    fn test_open_in_memory() {
        let store = create_test_store();
        assert!(store.is_in_memory());
        assert_eq!(store.path(), Path::new(":memory:"));
    }

    #[test]
    fn test_save_and_load() {
        let store = create_test_store();
        let value = vec![sample("one"), sample("two")];

        assert!(store.save("k", &value));
        let loaded: Vec<Sample> = store.load("k").unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_load_missing_key() {
        let store = create_test_store();
        let loaded: Option<Vec<Sample>> = store.load("missing");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let store = create_test_store();
        store.save("k", &sample("first"));
        store.save("k", &sample("second"));

        let loaded: Sample = store.load("k").unwrap();
        assert_eq!(loaded.name, "second");
        assert_eq!(store.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_corrupt_text_loads_as_none() {
        let store = create_test_store();
        store.put_raw("k", "{not json").unwrap();

        let loaded: Option<Sample> = store.load("k");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_wrong_shape_loads_as_none() {
        let store = create_test_store();
        store.save("k", &42);

        let loaded: Option<Sample> = store.load("k");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_keys_are_independent() {
        let store = create_test_store();
        store.save(keys::CREWS, &vec![sample("crew")]);
        store.save(keys::EVENTS, &vec![sample("event")]);

        assert!(store.remove(keys::CREWS));
        assert!(store.load::<Vec<Sample>>(keys::CREWS).is_none());
        assert!(store.load::<Vec<Sample>>(keys::EVENTS).is_some());
    }

    #[test]
    fn test_remove_missing_key() {
        let store = create_test_store();
        assert!(!store.remove("nothing"));
    }

    #[test]
    fn test_clear() {
        let store = create_test_store();
        store.save("a", &1);
        store.save("b", &2);

        assert_eq!(store.clear(), 2);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_stats() {
        let store = create_test_store();
        assert_eq!(store.stats().unwrap().entries, 0);

        store.save("a", "xyz");
        let stats = store.stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.value_bytes, 5); // "xyz" with quotes
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_open_file_based_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let store = Store::open(&path).unwrap();
            assert!(store.save("k", &sample("kept")));
        }

        let store = Store::open(&path).unwrap();
        let loaded: Sample = store.load("k").unwrap();
        assert_eq!(loaded.name, "kept");
        assert!(store.stats().unwrap().db_size_bytes > 0);
    }

    #[test]
    fn test_open_or_memory_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let store = Store::open_or_memory(dir.path()).unwrap();
        assert!(store.is_in_memory());
        assert!(store.save("k", &1));
    }
}
