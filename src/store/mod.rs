//! Reference Knowledge Store
//!
//! Read-only collection of known questions the matcher searches. The
//! pipeline only ever takes snapshots: an in-flight match keeps its own
//! [`StoreSnapshot`] and is immune to concurrent reloads or swaps.

pub mod sqlite;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use sqlite::SqliteStore;

/// A known question with its canonical answer.
///
/// Reference data; never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRecord {
    /// Stable identifier, unique within the store
    pub id: String,
    /// Question text
    pub question: String,
    /// Canonical answer
    pub answer: String,
    /// Worked explanation
    pub explanation: String,
    /// Subject tag (e.g. "Algebra")
    pub subject: String,
}

/// Immutable view of the store contents at one point in time.
pub type StoreSnapshot = Arc<[QuestionRecord]>;

/// Errors raised when the backing store cannot be reached or read.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed store file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Capability contract for reading the reference knowledge store.
pub trait QuestionStore: Send + Sync {
    /// Take an immutable snapshot of the current store contents.
    fn snapshot(&self) -> Result<StoreSnapshot, StoreError>;
}

/// In-memory store, swappable as a whole.
///
/// The owner may replace the record set at any time; readers holding an
/// earlier snapshot are unaffected.
pub struct MemoryStore {
    records: RwLock<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new(records: Vec<QuestionRecord>) -> Self {
        Self {
            records: RwLock::new(Arc::from(records)),
        }
    }

    /// Atomically replace the full record set.
    pub fn replace(&self, records: Vec<QuestionRecord>) {
        *self.records.write() = Arc::from(records);
    }
}

impl QuestionStore for MemoryStore {
    fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(self.records.read().clone())
    }
}

/// Store backed by a JSON file holding an array of [`QuestionRecord`]s.
///
/// Loaded lazily on first snapshot and cached; [`JsonFileStore::reload`]
/// re-reads the file and swaps the cache atomically.
pub struct JsonFileStore {
    path: PathBuf,
    cache: RwLock<Option<StoreSnapshot>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Re-read the backing file, replacing the cached snapshot.
    pub fn reload(&self) -> Result<StoreSnapshot, StoreError> {
        let snapshot = load_records(&self.path)?;
        *self.cache.write() = Some(snapshot.clone());
        info!(path = %self.path.display(), records = snapshot.len(), "question store loaded");
        Ok(snapshot)
    }
}

impl QuestionStore for JsonFileStore {
    fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        if let Some(ref cached) = *self.cache.read() {
            return Ok(cached.clone());
        }
        self.reload()
    }
}

fn load_records(path: &Path) -> Result<StoreSnapshot, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<QuestionRecord> =
        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Arc::from(records))
}
