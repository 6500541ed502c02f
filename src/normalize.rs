//! Raw server record normalization
//!
//! The backend embeds identifiers as `{"_id": {"$oid": "..."}}`. Every item
//! handed out by the cache carries a flat `id` instead.

use crate::error::{CacheError, Result};
use crate::types::Item;
use serde_json::Value;

const RAW_ID_FIELD: &str = "_id";
const RAW_OID_FIELD: &str = "$oid";

/// Normalize a single raw record
///
/// `index` is only used for error reporting.
pub fn normalize_record(index: usize, record: Value) -> Result<Item> {
    let Value::Object(mut fields) = record else {
        return Err(CacheError::MalformedRecord {
            index,
            reason: "record is not an object".to_string(),
        });
    };

    let id = match fields.remove(RAW_ID_FIELD) {
        Some(Value::Object(mut wrapper)) => match wrapper.remove(RAW_OID_FIELD) {
            Some(Value::String(oid)) => oid,
            _ => {
                return Err(CacheError::MalformedRecord {
                    index,
                    reason: format!("{}.{} is missing or not a string", RAW_ID_FIELD, RAW_OID_FIELD),
                })
            }
        },
        _ => {
            return Err(CacheError::MalformedRecord {
                index,
                reason: format!("{} is missing", RAW_ID_FIELD),
            })
        }
    };

    // A stray top-level `id` would shadow the canonical one after flattening
    fields.remove("id");

    Ok(Item { id, fields })
}

/// Parse a response body and normalize every record
///
/// A single malformed record rejects the whole batch.
pub fn normalize_body(body: &[u8]) -> Result<Vec<Item>> {
    let records: Vec<Value> = serde_json::from_slice(body)
        .map_err(|e| CacheError::MalformedResponse(e.to_string()))?;

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| normalize_record(index, record))
        .collect()
}
