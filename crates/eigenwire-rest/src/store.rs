//! SQLite-backed array store.
//!
//! One table, `eigen_db`, holding each posted array as JSON text tagged
//! `VECTOR` or `MATRIX`. The table is dropped and recreated on open, so a
//! server restart starts from an empty store.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use eigenwire_core::array::ArrayKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

fn type_tag(kind: ArrayKind) -> &'static str {
    match kind {
        ArrayKind::Vector => "VECTOR",
        ArrayKind::Matrix => "MATRIX",
    }
}

#[derive(Clone)]
pub struct ArrayStore {
    conn: Arc<Mutex<Connection>>,
}

impl ArrayStore {
    /// Open the database at `path`, creating parent directories, and reset
    /// the table.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::CreateDir(parent.to_path_buf(), e))?;
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "array store opened");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "DROP TABLE IF EXISTS eigen_db;
             CREATE TABLE eigen_db (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                eigen_type  TEXT    NOT NULL,
                eigen_value TEXT    NOT NULL
             );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Store `value` under a fresh id.
    pub fn insert(&self, kind: ArrayKind, value: &serde_json::Value) -> Result<i64, StoreError> {
        let text = serde_json::to_string(value)?;
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO eigen_db (eigen_type, eigen_value) VALUES (?1, ?2)",
            params![type_tag(kind), text],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Look up `id`. A row of the other kind counts as absent.
    pub fn fetch(&self, id: i64, kind: ArrayKind) -> Result<Option<serde_json::Value>, StoreError> {
        let text: Option<String> = {
            let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
            conn.query_row(
                "SELECT eigen_value FROM eigen_db WHERE id = ?1 AND eigen_type = ?2",
                params![id, type_tag(kind)],
                |row| row.get(0),
            )
            .optional()?
        };
        match text {
            Some(t) => Ok(Some(serde_json::from_str(&t)?)),
            None => Ok(None),
        }
    }
}
