//! Record domain model.
//!
//! # Responsibility
//! - Define the canonical record shared by every entity kind.
//! - Own timestamp generation, formatting and parsing.
//! - Expose custom attributes through an explicit ordered get/set API.
//!
//! # Invariants
//! - `id` is generated once and never changes.
//! - `created_at` is never mutated after construction.
//! - `touch()` always moves `updated_at` strictly forward.
//! - Reserved attribute names cannot be written through `set()`.

use chrono::{Duration, Local, NaiveDateTime, SubsecRound};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Persisted timestamp layout, microsecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
/// Human-readable timestamp layout used by the string form.
const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
/// Read layout; any fraction width is accepted.
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// Accepted on read when the fractional part was omitted.
const TIMESTAMP_FORMAT_NO_FRACTION: &str = "%Y-%m-%dT%H:%M:%S";

pub const ID_KEY: &str = "id";
pub const CREATED_AT_KEY: &str = "created_at";
pub const UPDATED_AT_KEY: &str = "updated_at";
/// Key carrying the type name in the persisted attribute object.
pub const TYPE_TAG_KEY: &str = "__class__";

const RESERVED_KEYS: [&str; 4] = [ID_KEY, CREATED_AT_KEY, UPDATED_AT_KEY, TYPE_TAG_KEY];

/// Returns whether `name` is managed by the record itself.
pub fn is_reserved_attribute(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

/// Tagged attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Timestamp(value) => write!(f, "{}", value.format(DISPLAY_TIMESTAMP_FORMAT)),
        }
    }
}

/// Error raised when a persisted timestamp cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampParseError {
    pub value: String,
}

impl Display for TimestampParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid timestamp `{}`; expected YYYY-MM-DDTHH:MM:SS.ffffff",
            self.value
        )
    }
}

impl Error for TimestampParseError {}

/// Formats a timestamp in the persisted layout.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp written by `format_timestamp`.
///
/// Values without a fractional part are accepted as well.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, TimestampParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_PARSE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT_NO_FRACTION))
        .map_err(|_| TimestampParseError {
            value: value.to_string(),
        })
}

/// Current local time truncated to the persisted precision.
fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(6)
}

/// Ordered name -> string mapping for custom attributes.
///
/// Insertion order is kept; overwriting a name keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Inserts or replaces one value. Returns the previous value if any.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical stored entity.
///
/// The concrete kind lives in `type_name`; kinds differ only in name, so one
/// struct serves every entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    type_name: String,
    id: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    attributes: Attributes,
}

impl Record {
    /// Creates a fresh record with a generated id and current timestamps.
    pub fn new(type_name: impl Into<String>) -> Self {
        let created_at = now();
        Self {
            type_name: type_name.into(),
            id: Uuid::new_v4().to_string(),
            created_at,
            updated_at: created_at,
            attributes: Attributes::new(),
        }
    }

    /// Rebuilds a record from persisted parts without generating anything.
    pub fn from_parts(
        type_name: impl Into<String>,
        id: impl Into<String>,
        created_at: NaiveDateTime,
        updated_at: NaiveDateTime,
        attributes: Attributes,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
            created_at,
            updated_at,
            attributes,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Composite registry key: `<type_name>.<id>`.
    pub fn key(&self) -> String {
        storage_key(&self.type_name, &self.id)
    }

    /// Reads one attribute, including the managed ones.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        match name {
            ID_KEY => Some(FieldValue::Text(self.id.clone())),
            CREATED_AT_KEY => Some(FieldValue::Timestamp(self.created_at)),
            UPDATED_AT_KEY => Some(FieldValue::Timestamp(self.updated_at)),
            _ => self
                .attributes
                .get(name)
                .map(|value| FieldValue::Text(value.to_string())),
        }
    }

    /// Sets a custom attribute.
    ///
    /// Returns `false` without mutating when `name` is reserved or empty.
    /// Does not touch `updated_at`; callers decide when a change is saved.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        if name.is_empty() || is_reserved_attribute(name) {
            return false;
        }
        self.attributes.set(name, value);
        true
    }

    /// Refreshes `updated_at`, keeping it strictly increasing.
    pub fn touch(&mut self) {
        let current = now();
        self.updated_at = if current > self.updated_at {
            current
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    /// All attributes in display order: id, created_at, updated_at, custom.
    pub fn fields(&self) -> Vec<(&str, FieldValue)> {
        let mut fields = vec![
            (ID_KEY, FieldValue::Text(self.id.clone())),
            (CREATED_AT_KEY, FieldValue::Timestamp(self.created_at)),
            (UPDATED_AT_KEY, FieldValue::Timestamp(self.updated_at)),
        ];
        fields.extend(
            self.attributes
                .iter()
                .map(|(name, value)| (name, FieldValue::Text(value.to_string()))),
        );
        fields
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ({}) {{", self.type_name, self.id)?;
        for (index, (name, value)) in self.fields().iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name:?}: {value}")?;
        }
        f.write_str("}")
    }
}

/// Builds the composite key used by storage and commands.
pub fn storage_key(type_name: &str, id: &str) -> String {
    format!("{type_name}.{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_roundtrip_keeps_microseconds() {
        let parsed = parse_timestamp("2017-09-28T21:05:54.119427").unwrap();
        assert_eq!(format_timestamp(&parsed), "2017-09-28T21:05:54.119427");
    }

    #[test]
    fn timestamp_without_fraction_is_accepted() {
        let parsed = parse_timestamp("2017-09-28T21:05:54").unwrap();
        assert_eq!(format_timestamp(&parsed), "2017-09-28T21:05:54.000000");
    }

    #[test]
    fn timestamp_rejects_garbage() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert_eq!(err.value, "yesterday");
    }

    #[test]
    fn attributes_keep_insertion_order_on_overwrite() {
        let mut attrs = Attributes::new();
        attrs.set("b", "1");
        attrs.set("a", "2");
        assert_eq!(attrs.set("b", "3").as_deref(), Some("1"));

        let names: Vec<_> = attrs.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(attrs.get("b"), Some("3"));
    }

    #[test]
    fn display_renders_managed_fields_first() {
        let created = parse_timestamp("2020-01-02T03:04:05.000006").unwrap();
        let mut attrs = Attributes::new();
        attrs.set("name", "Ada");
        let record = Record::from_parts("User", "abc", created, created, attrs);

        assert_eq!(
            record.to_string(),
            "[User] (abc) {\"id\": \"abc\", \"created_at\": 2020-01-02 03:04:05.000006, \
             \"updated_at\": 2020-01-02 03:04:05.000006, \"name\": \"Ada\"}"
        );
    }
}
