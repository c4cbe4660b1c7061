#![forbid(unsafe_code)]

use super::{Collection, RecordStore};
use crate::StoreError;
use rusqlite::{Connection, params};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const DB_FILE: &str = "qc_tracker.db";
const SCHEMA_VERSION: &str = "v1";

/// Collections stored as ordered JSON rows in a single SQLite table. Each
/// `save_all` replaces the collection inside one transaction.
#[derive(Debug)]
pub struct SqliteStore {
    storage_dir: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        install_schema(&conn)?;

        Ok(Self {
            storage_dir,
            conn: Mutex::new(conn),
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned("sqlite connection"))
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS records (
          collection TEXT NOT NULL,
          position INTEGER NOT NULL,
          body TEXT NOT NULL,
          PRIMARY KEY (collection, position)
        );
        "#,
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
        params!["schema_version", SCHEMA_VERSION],
    )?;
    Ok(())
}

impl RecordStore for SqliteStore {
    fn load_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT body FROM records WHERE collection = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![collection.name()], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for body in rows {
            let body = body?;
            let value = serde_json::from_str::<Value>(&body)
                .map_err(|err| StoreError::corrupt(collection.name(), err.to_string()))?;
            out.push(value);
        }
        Ok(out)
    }

    fn save_all(&self, collection: Collection, records: &[Value]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM records WHERE collection = ?1",
            params![collection.name()],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO records(collection, position, body) VALUES (?1, ?2, ?3)",
            )?;
            for (position, record) in records.iter().enumerate() {
                insert.execute(params![
                    collection.name(),
                    position as i64,
                    serde_json::to_string(record)?
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
