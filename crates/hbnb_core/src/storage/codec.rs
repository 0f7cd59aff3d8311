//! On-disk representation of the object registry.
//!
//! # Responsibility
//! - Serialize records as flattened attribute objects keyed by composite key.
//! - Decode persisted objects back into records through the kind registry.
//!
//! # Invariants
//! - Object and attribute order in the file follows iteration order on write
//!   and is preserved on read.
//! - Timestamps are written with microsecond precision.

use crate::model::kind::{KindRegistry, RecordParts};
use crate::model::record::{
    format_timestamp, parse_timestamp, Attributes, Record, CREATED_AT_KEY, ID_KEY,
    TYPE_TAG_KEY, UPDATED_AT_KEY,
};
use crate::storage::StorageError;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Formatter;
use std::marker::PhantomData;

/// Serializable view over the whole registry.
pub(crate) struct PersistedObjects<'a>(pub &'a BTreeMap<String, Record>);

impl Serialize for PersistedObjects<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, record) in self.0 {
            map.serialize_entry(key, &PersistedRecord(record))?;
        }
        map.end()
    }
}

/// Flattened attribute object for one record.
struct PersistedRecord<'a>(&'a Record);

impl Serialize for PersistedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.0;
        let mut map = serializer.serialize_map(Some(4 + record.attributes().len()))?;
        map.serialize_entry(ID_KEY, record.id())?;
        map.serialize_entry(CREATED_AT_KEY, &format_timestamp(&record.created_at()))?;
        map.serialize_entry(UPDATED_AT_KEY, &format_timestamp(&record.updated_at()))?;
        map.serialize_entry(TYPE_TAG_KEY, record.type_name())?;
        for (name, value) in record.attributes().iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// JSON object read as an ordered list of entries.
#[derive(Debug, Default)]
pub(crate) struct OrderedObject<V>(pub Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedObject<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedObjectVisitor(PhantomData))
    }
}

struct OrderedObjectVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedObjectVisitor<V> {
    type Value = OrderedObject<V>;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            entries.push((key, value));
        }
        Ok(OrderedObject(entries))
    }
}

/// Whole persisted file: composite key -> attribute object.
pub(crate) type PersistedFile = OrderedObject<OrderedObject<Value>>;

/// Outcome of decoding one persisted object.
#[derive(Debug)]
pub(crate) enum Decoded {
    Record(Record),
    UnknownKind(String),
}

/// Rebuilds one record from its persisted attribute object.
///
/// The type tag wins over the key prefix; the key prefix is only used when
/// the tag is absent.
pub(crate) fn decode_record(
    key: &str,
    object: OrderedObject<Value>,
    kinds: &KindRegistry,
) -> Result<Decoded, StorageError> {
    let mut id = None;
    let mut created_at = None;
    let mut updated_at = None;
    let mut type_name = None;
    let mut attributes = Attributes::new();

    for (name, value) in object.0 {
        match name.as_str() {
            ID_KEY => id = Some(expect_text(key, &name, value)?),
            CREATED_AT_KEY => created_at = Some(expect_timestamp(key, &name, value)?),
            UPDATED_AT_KEY => updated_at = Some(expect_timestamp(key, &name, value)?),
            TYPE_TAG_KEY => type_name = Some(expect_text(key, &name, value)?),
            _ => {
                attributes.set(name.as_str(), value_to_text(value));
            }
        }
    }

    let type_name = match type_name {
        Some(value) => value,
        None => key
            .split_once('.')
            .map(|(prefix, _)| prefix.to_string())
            .ok_or_else(|| invalid(key, "missing type tag and key has no type prefix"))?,
    };
    let Some(factory) = kinds.get(&type_name) else {
        return Ok(Decoded::UnknownKind(type_name));
    };

    let id = id.ok_or_else(|| invalid(key, "missing `id`"))?;
    let created_at = created_at.ok_or_else(|| invalid(key, "missing `created_at`"))?;
    let updated_at = updated_at.unwrap_or(created_at);

    Ok(Decoded::Record(factory.restore(RecordParts {
        id,
        created_at,
        updated_at,
        attributes,
    })))
}

fn expect_text(key: &str, name: &str, value: Value) -> Result<String, StorageError> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(invalid(
            key,
            &format!("`{name}` must be a string, got {other}"),
        )),
    }
}

fn expect_timestamp(
    key: &str,
    name: &str,
    value: Value,
) -> Result<chrono::NaiveDateTime, StorageError> {
    let text = expect_text(key, name, value)?;
    parse_timestamp(&text).map_err(|err| invalid(key, &format!("`{name}`: {err}")))
}

/// Custom attributes are strings; other JSON values keep their JSON text.
fn value_to_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn invalid(key: &str, message: &str) -> StorageError {
    StorageError::InvalidRecord {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> OrderedObject<Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn ordered_object_keeps_file_order() {
        let parsed: OrderedObject<Value> =
            serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
        let names: Vec<_> = parsed.0.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn decode_uses_key_prefix_when_tag_is_missing() {
        let kinds = KindRegistry::with_builtin_kinds();
        let decoded = decode_record(
            "City.c1",
            object(json!({
                "id": "c1",
                "created_at": "2021-05-01T10:00:00.000001",
                "updated_at": "2021-05-01T10:00:00.000002",
                "name": "Lyon",
                "population": 513275
            })),
            &kinds,
        )
        .unwrap();

        let Decoded::Record(record) = decoded else {
            panic!("expected a record");
        };
        assert_eq!(record.type_name(), "City");
        assert_eq!(record.attributes().get("name"), Some("Lyon"));
        assert_eq!(record.attributes().get("population"), Some("513275"));
    }

    #[test]
    fn decode_reports_unknown_kind() {
        let kinds = KindRegistry::with_builtin_kinds();
        let decoded = decode_record(
            "Spaceship.s1",
            object(json!({
                "id": "s1",
                "created_at": "2021-05-01T10:00:00.000001",
                "__class__": "Spaceship"
            })),
            &kinds,
        )
        .unwrap();
        assert!(matches!(decoded, Decoded::UnknownKind(name) if name == "Spaceship"));
    }

    #[test]
    fn decode_rejects_bad_timestamp() {
        let kinds = KindRegistry::with_builtin_kinds();
        let err = decode_record(
            "User.u1",
            object(json!({
                "id": "u1",
                "created_at": "not-a-date",
                "__class__": "User"
            })),
            &kinds,
        )
        .unwrap_err();
        assert!(err.to_string().contains("created_at"), "{err}");
    }
}
