//! Core of the HBNB record console.
//! Owns the record model, the JSON file storage and the command shell.

pub mod config;
pub mod logging;
pub mod model;
pub mod shell;
pub mod storage;

pub use config::ShellConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::kind::{EntityKind, KindRegistry, KindRegistryError, RecordFactory, RecordParts};
pub use model::record::{Attributes, FieldValue, Record};
pub use shell::{Shell, ShellError, ShellFlow};
pub use storage::{FileStorage, StorageError, StorageResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
