//! Command shell over the record storage.
//!
//! # Responsibility
//! - Accept canonical and method-call command syntax.
//! - Translate commands into storage operations and printed results.
//!
//! # Invariants
//! - The shell only uses public storage accessors.
//! - User errors are printed, storage and stream failures are returned.

use crate::storage::StorageError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod console;
pub mod syntax;

pub use console::{
    Shell, ShellFlow, ATTRIBUTE_NAME_MISSING, CLASS_NAME_MISSING, CLASS_UNKNOWN,
    DEFAULT_PROMPT, INSTANCE_ID_MISSING, INSTANCE_NOT_FOUND, VALUE_MISSING,
};

pub type ShellResult<T> = Result<T, ShellError>;

/// Failures that end the read loop.
#[derive(Debug)]
pub enum ShellError {
    Storage(StorageError),
    Io(std::io::Error),
}

impl Display for ShellError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "console I/O failed: {err}"),
        }
    }
}

impl Error for ShellError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<StorageError> for ShellError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<std::io::Error> for ShellError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
