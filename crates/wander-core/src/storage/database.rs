//! SQLite-backed persistence.
//!
//! Provides:
//! - The last journey's parameters, for "repeat last journey"
//! - A key-value store for application state

use rusqlite::{params, Connection};
use std::path::Path;

use super::data_dir;
use crate::error::{CoreError, DatabaseError};
use crate::journey::JourneyRecord;

const LAST_JOURNEY_KEY: &str = "last_journey";

/// SQLite database for journey persistence.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/wander/wander.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("wander.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns `OpenFailed` if the file cannot be opened, or a query error if
    /// the schema cannot be created.
    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Remember the parameters of the journey being started.
    ///
    /// # Errors
    /// Returns an error if the record cannot be encoded or written.
    pub fn save_last_journey(&self, record: &JourneyRecord) -> Result<(), CoreError> {
        let json = serde_json::to_string(record)?;
        self.kv_set(LAST_JOURNEY_KEY, &json)?;
        Ok(())
    }

    /// The most recently started journey, if any.
    ///
    /// # Errors
    /// Returns `CorruptRecord` if the stored value cannot be decoded.
    pub fn last_journey(&self) -> Result<Option<JourneyRecord>, CoreError> {
        let Some(json) = self.kv_get(LAST_JOURNEY_KEY)? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&json).map_err(|e| DatabaseError::CorruptRecord {
            key: LAST_JOURNEY_KEY.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(record))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use chrono::{TimeZone, Utc};

    fn record() -> JourneyRecord {
        JourneyRecord {
            total_duration: 3600,
            return_location: Coordinate::new(51.5, -0.12).unwrap(),
            start_time: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            buffer: 300,
        }
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn last_journey_roundtrip() {
        let db = Database::open_memory().unwrap();
        assert!(db.last_journey().unwrap().is_none());
        db.save_last_journey(&record()).unwrap();
        assert_eq!(db.last_journey().unwrap(), Some(record()));

        let mut newer = record();
        newer.buffer = 600;
        db.save_last_journey(&newer).unwrap();
        assert_eq!(db.last_journey().unwrap().unwrap().buffer, 600);
    }

    #[test]
    fn corrupt_record_is_reported() {
        let db = Database::open_memory().unwrap();
        db.kv_set(LAST_JOURNEY_KEY, "{not json").unwrap();
        assert!(matches!(
            db.last_journey(),
            Err(CoreError::Database(DatabaseError::CorruptRecord { .. }))
        ));
    }

    #[test]
    fn persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wander.db");
        Database::open_at(&path).unwrap().save_last_journey(&record()).unwrap();
        assert_eq!(Database::open_at(&path).unwrap().last_journey().unwrap(), Some(record()));
    }
}
