//! Durable JSON store for document records.
//!
//! Records live in a single JSON object keyed by document id, written atomically on every
//! insert. Identifiers are sequential and zero-padded (`DOC_001`, `DOC_002`, …) and derive
//! from the record count under the store's lock, which makes assignment safe within one
//! process only. Deletion is out of scope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Errors raised by the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store file could not be read or written.
    #[error("Store I/O failed for {path}: {source}")]
    Io {
        /// Path of the store file involved.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Store file contents could not be parsed or serialized.
    #[error("Store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Store timestamp could not be formatted.
    #[error("Store timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// A persisted document record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Sequential zero-padded identifier (`DOC_001`).
    pub id: String,
    /// Original filename supplied at ingestion.
    pub filename: String,
    /// Raw extracted text of the document.
    pub text: String,
    /// Generated or extractive summary.
    pub summary: String,
    /// Category label from the fixed label set.
    pub category: String,
    /// RFC3339 ingestion timestamp.
    pub date: String,
}

/// Listing view of a record, omitting the full text.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentListing {
    /// Sequential zero-padded identifier (`DOC_001`).
    pub id: String,
    /// Original filename supplied at ingestion.
    pub filename: String,
    /// Generated or extractive summary.
    pub summary: String,
    /// Category label from the fixed label set.
    pub category: String,
    /// RFC3339 ingestion timestamp.
    pub date: String,
}

/// JSON-file-backed document store.
pub struct DocumentStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, DocumentRecord>>,
}

impl DocumentStore {
    /// Open (or create) a store at the given path, loading any existing records.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        tracing::debug!(path = %path.display(), records = records.len(), "Opened document store");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Insert a new record, assigning the next sequential identifier.
    pub fn insert(
        &self,
        filename: String,
        text: String,
        summary: String,
        category: String,
    ) -> Result<DocumentRecord, StoreError> {
        let mut records = self.records.lock().expect("document store lock poisoned");
        let id = format!("DOC_{:03}", records.len() + 1);
        let record = DocumentRecord {
            id: id.clone(),
            filename,
            text,
            summary,
            category,
            date: OffsetDateTime::now_utc().format(&Rfc3339)?,
        };
        records.insert(id, record.clone());
        self.persist(&records)?;
        Ok(record)
    }

    /// List stored records in identifier order, omitting the full text.
    pub fn list(&self) -> Vec<DocumentListing> {
        let records = self.records.lock().expect("document store lock poisoned");
        records
            .values()
            .map(|record| DocumentListing {
                id: record.id.clone(),
                filename: record.filename.clone(),
                summary: record.summary.clone(),
                category: record.category.clone(),
                date: record.date.clone(),
            })
            .collect()
    }

    /// Fetch a single record by identifier.
    pub fn get(&self, id: &str) -> Option<DocumentRecord> {
        let records = self.records.lock().expect("document store lock poisoned");
        records.get(id).cloned()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .expect("document store lock poisoned")
            .len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, records: &BTreeMap<String, DocumentRecord>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let serialized = serde_json::to_string_pretty(records)?;
        let staged = staging_path(&self.path);
        fs::write(&staged, serialized).map_err(|source| StoreError::Io {
            path: staged.display().to_string(),
            source,
        })?;
        fs::rename(&staged, &self.path).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    PathBuf::from(staged)
}
