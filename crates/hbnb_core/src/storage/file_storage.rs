//! JSON file backed record registry.
//!
//! # Responsibility
//! - Keep records in memory keyed by `<type_name>.<id>`.
//! - Load the backing file once and rewrite it on demand.
//!
//! # Invariants
//! - A missing backing file is an empty registry, not an error.
//! - `register` never touches the disk; `persist` always rewrites all of it.
//! - Writes go to a sibling temp file that is renamed over the target.
//! - Records of unknown kinds are skipped on load with a warning.

use super::codec::{decode_record, Decoded, PersistedFile, PersistedObjects};
use super::{StorageError, StorageResult};
use crate::model::kind::KindRegistry;
use crate::model::record::Record;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// In-memory record registry mirrored to one JSON file.
pub struct FileStorage {
    path: PathBuf,
    objects: BTreeMap<String, Record>,
}

impl FileStorage {
    /// Creates an empty registry bound to `path` without reading it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            objects: BTreeMap::new(),
        }
    }

    /// Creates a registry bound to `path` and loads its current content.
    pub fn open(path: impl Into<PathBuf>, kinds: &KindRegistry) -> StorageResult<Self> {
        let mut storage = Self::new(path);
        storage.load(kinds)?;
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts `record` under its composite key. Memory only.
    pub fn register(&mut self, record: Record) {
        self.objects.insert(record.key(), record);
    }

    /// All records, ordered by composite key.
    pub fn all(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.objects
            .iter()
            .map(|(key, record)| (key.as_str(), record))
    }

    /// Records whose key prefix equals `type_name`.
    pub fn all_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Record> {
        self.objects
            .iter()
            .filter(move |(key, _)| key_type(key) == type_name)
            .map(|(_, record)| record)
    }

    pub fn count_of_type(&self, type_name: &str) -> usize {
        self.all_of_type(type_name).count()
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.objects.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Record> {
        self.objects.get_mut(key)
    }

    /// Removes one record from memory. Call `persist` to make it durable.
    pub fn remove(&mut self, key: &str) -> Option<Record> {
        self.objects.remove(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Rewrites the backing file with every record in memory.
    ///
    /// # Side effects
    /// - Creates `<file>.tmp` next to the target and renames it into place.
    /// - Emits `storage_persist` logging events with duration and status.
    pub fn persist(&self) -> StorageResult<()> {
        let started_at = Instant::now();
        match self.write_atomically() {
            Ok(()) => {
                info!(
                    "event=storage_persist module=storage status=ok records={} duration_ms={}",
                    self.objects.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=storage_persist module=storage status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Replaces memory content with the backing file content.
    ///
    /// Leaves the registry empty when the file does not exist.
    pub fn load(&mut self, kinds: &KindRegistry) -> StorageResult<()> {
        let started_at = Instant::now();
        info!(
            "event=storage_load module=storage status=start path={}",
            self.path.display()
        );

        let objects = match self.read_objects(kinds) {
            Ok(objects) => objects,
            Err(err) => {
                error!(
                    "event=storage_load module=storage status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };

        self.objects = objects;
        info!(
            "event=storage_load module=storage status=ok records={} duration_ms={}",
            self.objects.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn read_objects(&self, kinds: &KindRegistry) -> StorageResult<BTreeMap<String, Record>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let file: PersistedFile =
            serde_json::from_str(&text).map_err(|source| StorageError::Json {
                path: self.path.clone(),
                source,
            })?;

        let mut objects = BTreeMap::new();
        for (key, object) in file.0 {
            match decode_record(&key, object, kinds)? {
                Decoded::Record(record) => {
                    let record_key = record.key();
                    if record_key != key {
                        warn!(
                            "event=record_rekeyed module=storage status=warn stored_key={} key={}",
                            key, record_key
                        );
                    }
                    objects.insert(record_key, record);
                }
                Decoded::UnknownKind(type_name) => {
                    warn!(
                        "event=record_skipped module=storage status=warn key={} type={} reason=unknown_kind",
                        key, type_name
                    );
                }
            }
        }
        Ok(objects)
    }

    fn write_atomically(&self) -> StorageResult<()> {
        let body = serde_json::to_vec(&PersistedObjects(&self.objects)).map_err(|source| {
            StorageError::Json {
                path: self.path.clone(),
                source,
            }
        })?;

        let temp_path = temp_path_for(&self.path);
        let mut file = fs::File::create(&temp_path).map_err(|source| self.io_error(source))?;
        file.write_all(&body)
            .and_then(|()| file.sync_all())
            .map_err(|source| self.io_error(source))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Type prefix of a composite key.
fn key_type(key: &str) -> &str {
    key.split_once('.').map_or(key, |(prefix, _)| prefix)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
