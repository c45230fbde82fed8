//! SQLite-backed question store

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::info;

use super::{QuestionRecord, QuestionStore, StoreError, StoreSnapshot};

/// Question store backed by a SQLite database.
///
/// Snapshots read the whole table under a single connection lock; the
/// connection is never exposed, so writers elsewhere cannot corrupt an
/// in-flight read.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!(path = %path.display(), "question database opened");
        Ok(store)
    }

    /// In-memory database, for tests and seeding.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "CREATE TABLE IF NOT EXISTS questions (
                id          TEXT PRIMARY KEY,
                question    TEXT NOT NULL,
                answer      TEXT NOT NULL,
                explanation TEXT NOT NULL,
                subject     TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Insert or replace a record. Store maintenance is the owner's side of
    /// the contract; the pipeline itself never writes.
    pub fn upsert(&self, record: &QuestionRecord) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO questions (id, question, answer, explanation, subject)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                record.id,
                record.question,
                record.answer,
                record.explanation,
                record.subject
            ],
        )?;
        Ok(())
    }
}

impl QuestionStore for SqliteStore {
    fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, question, answer, explanation, subject FROM questions ORDER BY id",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(QuestionRecord {
                    id: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                    explanation: row.get(3)?,
                    subject: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arc::from(records))
    }
}
