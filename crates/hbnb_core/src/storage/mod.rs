//! Flat-file object storage.
//!
//! # Responsibility
//! - Own the canonical in-memory record set.
//! - Persist and reload it from a single JSON file.
//!
//! # Invariants
//! - Records are addressed only by `<type_name>.<id>`.
//! - Every persist is a full-file rewrite.
//! - I/O and decoding failures are surfaced, never swallowed.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod codec;
mod file_storage;

pub(crate) use codec::OrderedObject;
pub use file_storage::FileStorage;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidRecord {
        key: String,
        message: String,
    },
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "storage I/O failed on `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "storage file `{}` is not valid: {source}", path.display())
            }
            Self::InvalidRecord { key, message } => {
                write!(f, "invalid persisted record `{key}`: {message}")
            }
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidRecord { .. } => None,
        }
    }
}
