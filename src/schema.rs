//! Schema inference from a single example record.
//!
//! The source CMS (Drupal 7) has no machine-readable content model that we
//! can query, so the structure of a site is derived from one exported node.
//! Inference is tuned to Drupal exports:
//!
//! 1. Keys in [`NUMERIC_FIELDS`] are always numeric, whatever their wire type.
//! 2. Keys with the `field_` prefix are classified by naming convention
//!    (object-like, array-like, text-format, or unknown) and are optional.
//! 3. Everything else goes through [`infer_field_type`], which only guesses
//!    from string content (numeric-looking strings become coercing numbers).
//!
//! Known limitations:
//!
//! - Keys absent from the example cannot be inferred; there is no merging of
//!   schemas across examples.
//! - Arrays are described by their first element only.
//!
//! # Serialized form
//!
//! ```json
//! {
//!   "created": { "kind": "number", "coerce": true },
//!   "field_tags": { "kind": "array", "of": { "kind": "unknown" }, "optional": true },
//!   "title": { "kind": "string" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::coerce::{
    is_numeric_field, number_value, parse_int_prefix, parse_number, NUMERIC_FIELDS,
};
use crate::error::{Error, Result};

/// Field name → inferred schema. Ordered so that serialized schemas are stable.
pub type SchemaMap = BTreeMap<String, FieldSchema>;

/// Drupal fields that hold a structured value (image, media, paragraph, entity).
const OBJECT_FIELD_PREFIXES: &[&str] = &[
    "field_image",
    "field_media",
    "field_paragraph",
    "field_entity_reference",
];

/// Drupal multi-value fields.
const ARRAY_FIELD_PREFIXES: &[&str] = &[
    "field_tags",
    "field_terms",
    "field_reference",
    "field_paragraph",
];

/// Suffixes of text-with-format columns (`body_value`, `body_format`, ...).
const TEXT_FORMAT_SUFFIXES: &[&str] = &["_value", "_format", "_summary"];

/// Suffixes that make a non-`field_` key optional.
const OPTIONAL_SUFFIXES: &[&str] = &["_value", "_format"];

/// Fields commonly left empty on Drupal nodes.
const OPTIONAL_FIELDS: &[&str] = &[
    "field_image",
    "field_tags",
    "field_category",
    "field_body",
    "field_summary",
    "field_media",
    "field_date",
    "field_link",
    "field_reference",
    "field_boolean",
    "field_paragraph",
    "field_entity_reference",
    "field_taxonomy",
    "field_terms",
];

const DRUPAL_FIELD_PREFIX: &str = "field_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldType {
    /// `coerce` marks fields whose stored values may be numeric strings and
    /// must be converted on read.
    Number {
        #[serde(default, skip_serializing_if = "is_false")]
        coerce: bool,
    },
    String,
    Boolean,
    Date,
    Array {
        of: Box<FieldSchema>,
    },
    Object {
        fields: SchemaMap,
    },
    /// Object with arbitrary keys.
    Record {
        values: Box<FieldSchema>,
    },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(flatten)]
    pub kind: FieldType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FieldSchema {
    pub fn new(kind: FieldType) -> Self {
        Self {
            kind,
            optional: false,
        }
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number { coerce: false })
    }

    pub fn coerced_number() -> Self {
        Self::new(FieldType::Number { coerce: true })
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn unknown() -> Self {
        Self::new(FieldType::Unknown)
    }

    pub fn array_of(item: FieldSchema) -> Self {
        Self::new(FieldType::Array { of: Box::new(item) })
    }

    pub fn object(fields: SchemaMap) -> Self {
        Self::new(FieldType::Object { fields })
    }

    pub fn record_of(values: FieldSchema) -> Self {
        Self::new(FieldType::Record {
            values: Box::new(values),
        })
    }

    pub fn into_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_coerced_number(&self) -> bool {
        matches!(self.kind, FieldType::Number { coerce: true })
    }
}

/// PHP `DateTime` values JSON-encode as `{date, timezone_type, timezone}`.
fn is_date_like(map: &Map<String, Value>) -> bool {
    map.len() == 3
        && matches!(map.get("date"), Some(Value::String(_)))
        && map.contains_key("timezone_type")
        && map.contains_key("timezone")
}

/// Infer the schema of a single JSON value.
///
/// `key` is the field name the value was found under, if any; it only matters
/// for the numeric allowlist. Array elements are inferred without a key.
pub fn infer_field_type(value: &Value, key: Option<&str>) -> FieldSchema {
    if value.is_null() {
        return FieldSchema::unknown().into_optional();
    }

    if key.is_some_and(is_numeric_field) {
        return FieldSchema::coerced_number();
    }

    match value {
        Value::Array(items) => match items.first() {
            None => FieldSchema::array_of(FieldSchema::unknown()),
            Some(first) => FieldSchema::array_of(infer_field_type(first, None)),
        },
        Value::Object(map) if is_date_like(map) => FieldSchema::new(FieldType::Date),
        Value::Object(map) => FieldSchema::object(
            map.iter()
                .map(|(k, v)| (k.clone(), infer_field_type(v, Some(k.as_str()))))
                .collect(),
        ),
        Value::String(s) if parse_number(s).is_some() => FieldSchema::coerced_number(),
        Value::String(_) => FieldSchema::string(),
        Value::Number(_) => FieldSchema::number(),
        Value::Bool(_) => FieldSchema::new(FieldType::Boolean),
        Value::Null => FieldSchema::unknown(),
    }
}

/// Classify a `field_*` key by Drupal naming convention.
fn classify_drupal_field(key: &str) -> FieldSchema {
    let schema = if OBJECT_FIELD_PREFIXES.iter().any(|p| key.starts_with(p)) {
        FieldSchema::record_of(FieldSchema::unknown())
    } else if ARRAY_FIELD_PREFIXES.iter().any(|p| key.starts_with(p)) {
        FieldSchema::array_of(FieldSchema::unknown())
    } else if TEXT_FORMAT_SUFFIXES.iter().any(|s| key.ends_with(s)) {
        FieldSchema::string()
    } else {
        FieldSchema::unknown()
    };
    schema.into_optional()
}

fn is_commonly_optional(key: &str) -> bool {
    OPTIONAL_FIELDS.contains(&key) || OPTIONAL_SUFFIXES.iter().any(|s| key.ends_with(s))
}

/// Build a field schema for every key of an example record.
///
/// The caller's value is never modified; allowlisted numeric strings are
/// converted on a private copy before inference.
///
/// # Errors
///
/// [`Error::InvalidPayload`] if `example` is not an object or has no keys.
pub fn build_schema(example: &Value) -> Result<SchemaMap> {
    let source = example.as_object().ok_or_else(|| {
        Error::InvalidPayload("Example payload must be a non-null object".to_string())
    })?;
    if source.is_empty() {
        return Err(Error::InvalidPayload(
            "Example payload has no fields to infer".to_string(),
        ));
    }

    let mut record = source.clone();
    for field in NUMERIC_FIELDS {
        let parsed = match record.get(*field) {
            Some(Value::String(s)) => parse_int_prefix(s),
            _ => None,
        };
        if let Some(n) = parsed {
            record.insert((*field).to_string(), Value::from(n));
        }
    }

    let mut schema = SchemaMap::new();
    for (key, value) in &record {
        let field = if is_numeric_field(key) {
            FieldSchema::coerced_number()
        } else if key.starts_with(DRUPAL_FIELD_PREFIX) {
            classify_drupal_field(key)
        } else {
            let inferred = infer_field_type(value, Some(key.as_str()));
            if is_commonly_optional(key) {
                inferred.into_optional()
            } else {
                inferred
            }
        };
        schema.insert(key.clone(), field);
    }

    Ok(schema)
}

/// Pick the record to infer from out of a possibly-nested payload.
///
/// - `{ "structure": [first, ...] }` → `first`, when it is an object.
/// - `[first, ...]` (a raw bulk export) → `first`, when it is an object.
/// - any other object → the payload itself.
pub fn extract_inference_target(payload: &Value) -> Result<&Map<String, Value>> {
    let target = match payload {
        Value::Object(map) => match map.get("structure") {
            Some(Value::Array(items)) => match items.first() {
                Some(Value::Object(first)) => first,
                _ => map,
            },
            _ => map,
        },
        Value::Array(items) => match items.first() {
            Some(Value::Object(first)) => first,
            _ => {
                return Err(Error::InvalidPayload(
                    "Received invalid payload: array without an object record".to_string(),
                ))
            }
        },
        _ => {
            return Err(Error::InvalidPayload(
                "Received invalid payload: not an object or null.".to_string(),
            ))
        }
    };

    if target.is_empty() {
        return Err(Error::InvalidPayload(
            "Could not derive valid object for schema inference.".to_string(),
        ));
    }

    Ok(target)
}

/// Convert numeric-looking strings on allowlisted keys to numbers, in place.
///
/// Object and array values on those keys have their numeric-string entries
/// converted too (e.g. a multi-valued `uid`).
pub fn coerce_numeric_fields(record: &mut Map<String, Value>) {
    fn coerce_scalar(value: &mut Value) {
        if let Value::String(s) = value {
            if let Some(n) = parse_number(s).and_then(number_value) {
                *value = n;
            }
        }
    }

    for field in NUMERIC_FIELDS {
        match record.get_mut(*field) {
            Some(Value::Object(inner)) => inner.values_mut().for_each(coerce_scalar),
            Some(Value::Array(items)) => items.iter_mut().for_each(coerce_scalar),
            Some(value) => coerce_scalar(value),
            None => {}
        }
    }
}

/// Mark every allowlisted key present in `schema` as a required coercing number.
pub fn force_numeric_fields(schema: &mut SchemaMap) {
    for (key, field) in schema.iter_mut() {
        if is_numeric_field(key) {
            *field = FieldSchema::coerced_number();
        }
    }
}

/// Apply a stored schema to a record read back from the CMS.
///
/// Fields described as coercing numbers are converted from numeric strings;
/// nested objects and arrays are walked according to their schema. Values the
/// schema does not describe, or that do not parse, are left untouched.
pub fn coerce_record(schema: &SchemaMap, record: &Value) -> Value {
    let Value::Object(map) = record else {
        return record.clone();
    };

    let mut out = map.clone();
    for (key, value) in out.iter_mut() {
        if let Some(field) = schema.get(key) {
            *value = coerce_value(field, value);
        }
    }
    Value::Object(out)
}

fn coerce_value(field: &FieldSchema, value: &Value) -> Value {
    match (&field.kind, value) {
        (FieldType::Number { coerce: true }, Value::String(s)) => parse_number(s)
            .and_then(number_value)
            .unwrap_or_else(|| value.clone()),
        (FieldType::Object { fields }, Value::Object(_)) => coerce_record(fields, value),
        (FieldType::Array { of }, Value::Array(items)) => {
            Value::Array(items.iter().map(|v| coerce_value(of, v)).collect())
        }
        _ => value.clone(),
    }
}

pub fn schema_to_json(schema: &SchemaMap) -> Result<String> {
    Ok(serde_json::to_string(schema)?)
}

pub fn schema_from_json(json: &str) -> Result<SchemaMap> {
    Ok(serde_json::from_str(json)?)
}
