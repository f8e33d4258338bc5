//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between DynamoDB AttributeValue maps and
//! rows. These are testable in isolation without DynamoDB access.
//!
//! Every property is written next to a `<name>@type` attribute holding its
//! stored kind, so empty payloads and text-encoded kinds survive a round
//! trip. Items without markers are inferred from the attribute type.

use std::collections::{BTreeMap, HashMap};

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use tablemap_core::entity::{Entity, KIND_MARKER_SUFFIX, PARTITION_KEY, ROW_KEY};
use tablemap_core::store::StoreResult;
use tablemap_core::value::{StoredKind, StoredValue};
use tablemap_core::StoreError;

use crate::storage::token::ContinuationToken;

pub type Item = HashMap<String, AttributeValue>;

/// Suffix of the attribute carrying a property's stored kind.
pub const TYPE_SUFFIX: &str = KIND_MARKER_SUFFIX;

// DynamoDB numbers hold magnitudes in [1e-130, 1e126).
const MIN_NUMBER_MAGNITUDE: f64 = 1e-130;
const MAX_NUMBER_MAGNITUDE: f64 = 1e126;

// ============================================================================
// Row conversions
// ============================================================================

/// Convert a row to a DynamoDB item.
pub fn entity_to_item(entity: &Entity) -> Item {
    let mut item = key_item(entity.partition_key(), entity.row_key());

    for (name, value) in entity.properties() {
        item.insert(name.clone(), stored_to_attribute(value));
        item.insert(
            marker_name(name),
            AttributeValue::S(value.kind().as_str().to_string()),
        );
    }

    item
}

/// Convert a DynamoDB item to a row.
pub fn item_to_entity(item: &Item) -> StoreResult<Entity> {
    let partition_key = get_key(item, PARTITION_KEY)?;
    let row_key = get_key(item, ROW_KEY)?;
    let mut properties = BTreeMap::new();

    for (name, attribute) in item {
        if name == PARTITION_KEY || name == ROW_KEY || name.ends_with(TYPE_SUFFIX) {
            continue;
        }

        let kind = match item.get(&marker_name(name)) {
            Some(marker) => parse_marker(name, marker)?,
            None => match infer_kind(attribute) {
                Some(kind) => kind,
                None => {
                    tracing::debug!(property = %name, "Skipping attribute with no storable kind");
                    continue;
                }
            },
        };

        properties.insert(name.clone(), attribute_to_stored(name, attribute, kind)?);
    }

    Entity::from_parts(partition_key, row_key, properties)
        .map_err(|e| StoreError::Fatal(e.to_string()))
}

/// The primary key attributes of one row.
pub fn key_item(partition_key: &str, row_key: &str) -> Item {
    let mut key = HashMap::new();
    key.insert(
        PARTITION_KEY.to_string(),
        AttributeValue::S(partition_key.to_string()),
    );
    key.insert(ROW_KEY.to_string(), AttributeValue::S(row_key.to_string()));
    key
}

// ============================================================================
// Continuation tokens
// ============================================================================

/// Encode a `LastEvaluatedKey` as a continuation token.
pub fn key_to_token(key: &Item) -> StoreResult<String> {
    ContinuationToken::new(get_key(key, PARTITION_KEY)?, get_key(key, ROW_KEY)?).encode()
}

/// Decode a continuation token into an `ExclusiveStartKey`.
pub fn token_to_key(token: &str) -> StoreResult<Item> {
    let token = ContinuationToken::decode(token)?;
    Ok(key_item(&token.partition_key, &token.row_key))
}

// ============================================================================
// Value conversions
// ============================================================================

/// Convert a stored value to its attribute. Empty payloads become `NULL`.
pub fn stored_to_attribute(value: &StoredValue) -> AttributeValue {
    match value {
        StoredValue::Bool(Some(v)) => AttributeValue::Bool(*v),
        StoredValue::Binary(Some(v)) => AttributeValue::B(Blob::new(v.clone())),
        StoredValue::DateTime(Some(v)) => {
            AttributeValue::S(v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        StoredValue::Double(Some(v)) if is_representable_number(*v) => {
            AttributeValue::N(v.to_string())
        }
        StoredValue::Double(Some(v)) => AttributeValue::S(v.to_string()),
        StoredValue::Guid(Some(v)) => AttributeValue::S(v.hyphenated().to_string()),
        StoredValue::Int32(Some(v)) => AttributeValue::N(v.to_string()),
        StoredValue::Int64(Some(v)) => AttributeValue::N(v.to_string()),
        StoredValue::String(Some(v)) => AttributeValue::S(v.clone()),
        _ => AttributeValue::Null(true),
    }
}

/// Convert an attribute to a stored value of `kind`.
pub fn attribute_to_stored(
    name: &str,
    attribute: &AttributeValue,
    kind: StoredKind,
) -> StoreResult<StoredValue> {
    if let AttributeValue::Null(_) = attribute {
        return Ok(kind.null());
    }

    let value = match (kind, attribute) {
        (StoredKind::Bool, AttributeValue::Bool(v)) => StoredValue::Bool(Some(*v)),
        (StoredKind::Binary, AttributeValue::B(v)) => StoredValue::Binary(Some(v.as_ref().to_vec())),
        (StoredKind::DateTime, AttributeValue::S(v)) => {
            let instant = DateTime::parse_from_rfc3339(v)
                .map_err(|e| invalid_data(name, format!("invalid datetime: {}", e)))?;
            StoredValue::DateTime(Some(instant.with_timezone(&Utc)))
        }
        (StoredKind::Double, AttributeValue::N(v) | AttributeValue::S(v)) => StoredValue::Double(
            Some(v.parse().map_err(|e| invalid_data(name, format!("invalid double: {}", e)))?),
        ),
        (StoredKind::Guid, AttributeValue::S(v)) => StoredValue::Guid(Some(
            Uuid::parse_str(v).map_err(|e| invalid_data(name, format!("invalid UUID: {}", e)))?,
        )),
        (StoredKind::Int32, AttributeValue::N(v)) => StoredValue::Int32(Some(
            v.parse().map_err(|e| invalid_data(name, format!("invalid int32: {}", e)))?,
        )),
        (StoredKind::Int64, AttributeValue::N(v)) => StoredValue::Int64(Some(
            v.parse().map_err(|e| invalid_data(name, format!("invalid int64: {}", e)))?,
        )),
        (StoredKind::String, AttributeValue::S(v)) => StoredValue::String(Some(v.clone())),
        (kind, _) => {
            return Err(invalid_data(
                name,
                format!("attribute does not hold a {}", kind.as_str()),
            ))
        }
    };

    Ok(value)
}

/// The stored kind of an attribute written without a marker.
pub fn infer_kind(attribute: &AttributeValue) -> Option<StoredKind> {
    match attribute {
        AttributeValue::Bool(_) => Some(StoredKind::Bool),
        AttributeValue::B(_) => Some(StoredKind::Binary),
        AttributeValue::N(v) if v.parse::<i64>().is_ok() => Some(StoredKind::Int64),
        AttributeValue::N(_) => Some(StoredKind::Double),
        AttributeValue::S(_) | AttributeValue::Null(_) => Some(StoredKind::String),
        _ => None,
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn marker_name(name: &str) -> String {
    format!("{}{}", name, TYPE_SUFFIX)
}

fn parse_marker(name: &str, marker: &AttributeValue) -> StoreResult<StoredKind> {
    marker
        .as_s()
        .ok()
        .and_then(|s| StoredKind::parse(s))
        .ok_or_else(|| invalid_data(name, "unknown type marker".to_string()))
}

fn get_key(item: &Item, key: &str) -> StoreResult<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| StoreError::Fatal(format!("Missing or invalid key attribute: {}", key)))
}

fn is_representable_number(v: f64) -> bool {
    v == 0.0 || (MIN_NUMBER_MAGNITUDE..MAX_NUMBER_MAGNITUDE).contains(&v.abs())
}

fn invalid_data(name: &str, reason: String) -> StoreError {
    StoreError::Fatal(format!("Invalid attribute {}: {}", name, reason))
}
