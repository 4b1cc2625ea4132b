//! SQLite-backed storage

use super::EntryStorage;
use crate::error::Result;
use crate::ingest::ImportResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// One row of the import history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub imported_at: DateTime<Utc>,
    pub year: i32,
    pub imported: i64,
    pub skipped_lines: i64,
    pub skipped_chunks: i64,
}

/// Database handle (single connection)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves the connection usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ============================================
    // Storage slots
    // ============================================

    /// Read the payload stored under `key`
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connection();
        let value = conn
            .query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Replace the payload stored under `key`
    pub fn put_value(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO storage (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ============================================
    // Import history
    // ============================================

    /// Append one import to the history
    pub fn record_import(&self, result: &ImportResult) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO imports (imported_at, year, imported, skipped_lines, skipped_chunks)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                Utc::now().to_rfc3339(),
                result.year,
                result.imported_count() as i64,
                result.skipped_lines as i64,
                result.skipped_chunks as i64,
            ],
        )?;
        Ok(())
    }

    /// Most recent imports first
    pub fn list_imports(&self, limit: usize) -> Result<Vec<ImportRecord>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            r#"
            SELECT imported_at, year, imported, skipped_lines, skipped_chunks
            FROM imports
            ORDER BY imported_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let imported_at: String = row.get(0)?;
            Ok(ImportRecord {
                imported_at: parse_utc(&imported_at).unwrap_or_default(),
                year: row.get(1)?,
                imported: row.get(2)?,
                skipped_lines: row.get(3)?,
                skipped_chunks: row.get(4)?,
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl EntryStorage for Database {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key)
    }

    fn write(&self, key: &str, payload: &str) -> Result<()> {
        self.put_value(key, payload)
    }
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_put_and_get_value() {
        let db = db();
        assert_eq!(db.get_value("k").unwrap(), None);

        db.put_value("k", "[]").unwrap();
        db.put_value("k", "[1]").unwrap();
        assert_eq!(db.get_value("k").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_entry_storage_impl() {
        let db = db();
        EntryStorage::write(&db, "habit-cal-entries", "[]").unwrap();
        assert_eq!(
            EntryStorage::read(&db, "habit-cal-entries").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_import_history() {
        let db = db();
        let result = ImportResult {
            year: 2024,
            skipped_lines: 2,
            ..Default::default()
        };
        db.record_import(&result).unwrap();
        db.record_import(&result).unwrap();

        let history = db.list_imports(10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].year, 2024);
        assert_eq!(history[0].skipped_lines, 2);
        assert_eq!(history[0].imported, 0);
        assert_eq!(db.list_imports(1).unwrap().len(), 1);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.db");
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        assert!(path.exists());
    }
}
