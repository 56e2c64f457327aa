//! Failures of the preference store. Only `PrefStore::open*` surfaces
//! these to callers; everything behind the swallowing surface logs and
//! degrades instead.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum StoreError {
    /// Anything the underlying SQLite layer reports.
    Sqlite(rusqlite::Error),
    /// The data directory for `prefs.db` could not be created.
    DataDir { path: PathBuf, source: io::Error },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "preference database error: {e}"),
            StoreError::DataDir { path, source } => {
                write!(f, "cannot create data directory {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::DataDir { source, .. } => Some(source),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
