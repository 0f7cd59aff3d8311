//! Entity kind registry.
//!
//! # Responsibility
//! - Map type-name strings to record factories.
//! - Serve both fresh construction (`create`) and reconstruction from
//!   persisted data (`restore`).
//!
//! # Invariants
//! - Type names are unique, non-empty identifiers without `.`.
//! - The registry is fully populated before the shell starts.

use crate::model::record::{Attributes, Record};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Kinds known to a stock installation.
pub const BUILTIN_KINDS: [&str; 7] = [
    "BaseModel",
    "User",
    "Place",
    "State",
    "City",
    "Amenity",
    "Review",
];

/// Persisted state handed to `RecordFactory::restore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordParts {
    pub id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub attributes: Attributes,
}

/// Constructor contract for one entity kind.
pub trait RecordFactory: Send + Sync {
    fn type_name(&self) -> &str;

    /// Builds a new record with fresh id and timestamps.
    fn create(&self) -> Record {
        Record::new(self.type_name())
    }

    /// Rebuilds a record from persisted parts. Never regenerates timestamps.
    fn restore(&self, parts: RecordParts) -> Record {
        Record::from_parts(
            self.type_name(),
            parts.id,
            parts.created_at,
            parts.updated_at,
            parts.attributes,
        )
    }
}

/// Plain entity kind identified by name only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityKind {
    name: String,
}

impl EntityKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RecordFactory for EntityKind {
    fn type_name(&self) -> &str {
        &self.name
    }
}

/// Kind registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindRegistryError {
    InvalidTypeName(String),
    DuplicateTypeName(String),
}

impl Display for KindRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTypeName(value) => write!(f, "type name is invalid: `{value}`"),
            Self::DuplicateTypeName(value) => write!(f, "type name already registered: {value}"),
        }
    }
}

impl Error for KindRegistryError {}

/// Name -> factory lookup table.
#[derive(Default)]
pub struct KindRegistry {
    kinds: BTreeMap<String, Arc<dyn RecordFactory>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every entry of `BUILTIN_KINDS`.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        for name in BUILTIN_KINDS {
            registry.kinds.insert(
                name.to_string(),
                Arc::new(EntityKind::new(name)) as Arc<dyn RecordFactory>,
            );
        }
        registry
    }

    /// Registers one factory under its own type name.
    pub fn register(&mut self, factory: Arc<dyn RecordFactory>) -> Result<(), KindRegistryError> {
        let name = factory.type_name().to_string();
        if !is_valid_type_name(&name) {
            return Err(KindRegistryError::InvalidTypeName(name));
        }
        if self.kinds.contains_key(&name) {
            return Err(KindRegistryError::DuplicateTypeName(name));
        }

        self.kinds.insert(name, factory);
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn RecordFactory>> {
        self.kinds.get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.kinds.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn is_valid_type_name(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_every_stock_kind() {
        let registry = KindRegistry::with_builtin_kinds();
        assert_eq!(registry.len(), BUILTIN_KINDS.len());
        for name in BUILTIN_KINDS {
            assert!(registry.contains(name), "missing kind {name}");
        }
        assert!(!registry.contains("user"));
    }

    #[test]
    fn register_rejects_duplicates_and_bad_names() {
        let mut registry = KindRegistry::with_builtin_kinds();

        let duplicate = registry
            .register(Arc::new(EntityKind::new("User")))
            .unwrap_err();
        assert_eq!(duplicate, KindRegistryError::DuplicateTypeName("User".into()));

        for bad in ["", "Bad.Name", "9Lives", "with space"] {
            let err = registry.register(Arc::new(EntityKind::new(bad))).unwrap_err();
            assert!(matches!(err, KindRegistryError::InvalidTypeName(_)), "{bad}");
        }

        registry.register(Arc::new(EntityKind::new("Booking"))).unwrap();
        assert!(registry.contains("Booking"));
    }

    #[test]
    fn factory_create_uses_its_type_name() {
        let registry = KindRegistry::with_builtin_kinds();
        let record = registry.get("Place").unwrap().create();
        assert_eq!(record.type_name(), "Place");
        assert_eq!(record.created_at(), record.updated_at());
    }
}
