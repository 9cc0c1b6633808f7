//! JSON wire form of [`Table`].
//!
//! Dense index tables (`[0]..[n-1]`) become arrays, sparse index tables become
//! objects keyed by the decimal index, name tables become objects. Decoding is
//! the reverse for arrays and objects, which means a sparse index table comes
//! back as a name table; that is the same loss the remote stores exhibit.

use super::lenient::Lenient;
use crate::core::{BindError, RecordKey, RecordValue, Result, Table};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

pub fn table_to_json(table: &Table) -> Result<JsonValue> {
    let mut index_keys = 0usize;
    let mut name_keys = 0usize;
    for key in table.keys() {
        match key {
            RecordKey::Index(_) => index_keys += 1,
            RecordKey::Name(_) => name_keys += 1,
        }
    }

    if index_keys > 0 && name_keys > 0 {
        return Err(BindError::Serialization(
            "table mixes index and name keys".to_string(),
        ));
    }

    if index_keys > 0 && is_dense(table) {
        let mut items: Vec<(u64, &RecordValue)> = table
            .iter()
            .filter_map(|(k, v)| k.as_index().map(|idx| (idx, v)))
            .collect();
        items.sort_by_key(|(idx, _)| *idx);
        let array = items
            .into_iter()
            .map(|(_, v)| value_to_json(v))
            .collect::<Result<Vec<_>>>()?;
        return Ok(JsonValue::Array(array));
    }

    let mut object = Map::new();
    for (key, value) in table.iter() {
        let name = match key {
            RecordKey::Index(idx) => idx.to_string(),
            RecordKey::Name(name) => name.clone(),
        };
        object.insert(name, value_to_json(value)?);
    }
    Ok(JsonValue::Object(object))
}

pub fn value_to_json(value: &RecordValue) -> Result<JsonValue> {
    Ok(match value {
        RecordValue::Null => JsonValue::Null,
        RecordValue::Bool(b) => JsonValue::Bool(*b),
        RecordValue::Number(n) => JsonValue::Number(n.clone()),
        RecordValue::String(s) => JsonValue::String(s.clone()),
        RecordValue::Table(t) => table_to_json(t)?,
    })
}

/// Decodes a JSON document that must be an object or an array.
pub fn table_from_json(value: JsonValue) -> Result<Table> {
    match value_from_json(value) {
        RecordValue::Table(table) => Ok(table),
        other => Err(BindError::Serialization(format!(
            "expected a JSON object or array, found {}",
            other.type_name()
        ))),
    }
}

pub fn value_from_json(value: JsonValue) -> RecordValue {
    match value {
        JsonValue::Null => RecordValue::Null,
        JsonValue::Bool(b) => RecordValue::Bool(b),
        JsonValue::Number(n) => RecordValue::Number(n),
        JsonValue::String(s) => RecordValue::String(s),
        JsonValue::Array(items) => {
            RecordValue::Table(Table::list(items.into_iter().map(value_from_json)))
        }
        JsonValue::Object(map) => RecordValue::Table(
            map.into_iter()
                .map(|(k, v)| (k, value_from_json(v)))
                .collect(),
        ),
    }
}

pub fn encode_document(table: &Table) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&table_to_json(table)?)?)
}

pub fn decode_document(bytes: &[u8]) -> Result<Table> {
    table_from_json(serde_json::from_slice(bytes)?)
}

/// Deserializes a table through serde. Empty tables read as whichever of
/// sequence or map the target field expects.
pub fn from_table<T: DeserializeOwned>(table: &Table) -> Result<T> {
    let value = table_to_json(table)?;
    serde::Deserialize::deserialize(Lenient(value))
        .map_err(|err: serde_json::Error| BindError::Deserialize(err.to_string()))
}

fn is_dense(table: &Table) -> bool {
    let len = table.len() as u64;
    let mut seen = vec![false; table.len()];
    for key in table.keys() {
        match key.as_index() {
            Some(idx) if idx < len => seen[idx as usize] = true,
            _ => return false,
        }
    }
    seen.into_iter().all(|hit| hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dense_index_table_encodes_as_array() {
        let table = Table::new().with(1u64, "b").with(0u64, "a");
        assert_eq!(table_to_json(&table).unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn sparse_index_table_encodes_as_object() {
        let table = Table::new().with(0u64, "a").with(5u64, "f");
        assert_eq!(table_to_json(&table).unwrap(), json!({"0": "a", "5": "f"}));
    }

    #[test]
    fn mixed_table_is_refused() {
        let table = Table::new().with(0u64, "a").with("x", "b");
        assert!(matches!(
            table_to_json(&table),
            Err(BindError::Serialization(_))
        ));
    }

    #[test]
    fn nested_document_decodes() {
        let doc = json!({"coins": 10, "items": ["a", "b"], "meta": {"ok": true}});
        let table = table_from_json(doc).unwrap();
        assert_eq!(table.get_i64("coins"), Some(10));
        assert_eq!(table.get_table("items").unwrap().len(), 2);
        assert_eq!(table.get_table("meta").unwrap().get_bool("ok"), Some(true));
    }

    #[test]
    fn scalar_document_is_not_a_table() {
        assert!(table_from_json(json!(3)).is_err());
    }
}
