//! Version-tagged encode/decode of a single sub-record.
//!
//! Decoding dispatches on the tag stored alongside the record, so an old
//! record goes through the procedure written for its schema. Encoding always
//! writes the latest shape and tag, which migrates the record forward on the
//! first save after a successful decode.

use super::BindingContext;
use super::schema::Schema;
use crate::core::{BindError, RecordValue, Result, Table};

/// Reserved field holding the version tag of a stored sub-record.
pub const VERSION_FIELD: &str = "__VERSION";

/// Removes the version tag from `stored`, accepting string or numeric tags.
pub fn take_version_tag(stored: &mut Table) -> Option<String> {
    match stored.remove(VERSION_FIELD)? {
        RecordValue::String(tag) => Some(tag),
        RecordValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decodes `stored` into `obj` and returns the tag it was decoded from.
///
/// On error `obj` keeps whatever the procedure wrote before failing.
pub fn decode<T>(
    obj: &mut T,
    schema: &Schema<T>,
    mut stored: Table,
    ctx: &BindingContext,
    sub_key: &str,
) -> Result<String> {
    let versions = schema
        .version_table()
        .ok_or_else(|| BindError::MissingVersionTable(sub_key.to_string()))?;
    let latest = versions
        .latest_tag()
        .ok_or_else(|| BindError::NoLatestVersion(sub_key.to_string()))?;

    let tag = take_version_tag(&mut stored).unwrap_or_else(|| latest.to_string());
    let procedure = versions
        .procedure(&tag)
        .ok_or_else(|| BindError::UnknownVersion {
            sub_key: sub_key.to_string(),
            tag: tag.clone(),
        })?;

    procedure(obj, stored, ctx)?;
    Ok(tag)
}

/// Serializes `obj` and stamps the latest version tag into the result.
pub fn encode<T>(obj: &T, schema: &Schema<T>, sub_key: &str) -> Result<Table> {
    let serialize = schema
        .serialize_fn()
        .ok_or_else(|| BindError::NotSerializable(sub_key.to_string()))?;
    let latest = schema
        .latest_tag()
        .ok_or_else(|| BindError::NoLatestVersion(sub_key.to_string()))?;

    let mut record = serialize(obj)?;
    record.insert(VERSION_FIELD, latest);
    Ok(record)
}
