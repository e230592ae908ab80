//! Core data models.
//!
//! [`ContentNode`] is the read-only input exported by the source CMS,
//! [`VectorObject`] is what gets written to the vector store, and
//! [`SiteSchema`] / [`Site`] are the rows kept in the metadata database.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One content item from the source CMS bulk export.
///
/// Drupal serializes most columns as strings but is not consistent about it,
/// so scalar fields accept strings, numbers, or booleans and are kept in their
/// string form. `body` may be plain HTML or a field structure such as
/// `{"und": [{"value": "<p>..</p>", "format": "full_html"}]}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ContentNode {
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub nid: String,
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub title: String,
    #[serde(default, deserialize_with = "de_body")]
    pub body: String,
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub created: String,
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub status: String,
    #[serde(default, rename = "type", deserialize_with = "de_scalar_string")]
    pub node_type: String,
}

impl ContentNode {
    pub fn is_published(&self) -> bool {
        self.status == "1"
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        _ => String::new(),
    }
}

fn de_scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

fn de_body<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(body_text(&value))
}

/// Extract body HTML from either a string or a Drupal field structure.
///
/// For structured bodies the first `value` string found depth-first wins.
pub fn body_text(value: &Value) -> String {
    fn find_value(v: &Value) -> Option<&str> {
        match v {
            Value::Object(map) => {
                if let Some(Value::String(s)) = map.get("value") {
                    return Some(s);
                }
                map.values().find_map(find_value)
            }
            Value::Array(items) => items.iter().find_map(find_value),
            _ => None,
        }
    }

    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => find_value(value).unwrap_or_default().to_string(),
        other => scalar_to_string(other),
    }
}

/// Properties stored on each vector-store object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VectorProperties {
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub nid: String,
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub title: String,
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub body: String,
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub created: String,
    #[serde(default, deserialize_with = "de_scalar_string")]
    pub status: String,
    #[serde(default, rename = "type", deserialize_with = "de_scalar_string")]
    pub node_type: String,
}

/// Write target for the vector store: `{ class, properties }`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VectorObject {
    pub class: String,
    pub properties: VectorProperties,
}

/// Persisted schema row (`schemas` table).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSchema {
    pub id: i64,
    pub site_id: i64,
    pub cms_id: i64,
    /// JSON-encoded field name → inferred field schema mapping.
    pub schema_json: String,
    pub description: String,
    pub version: String,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Site metadata row (`sites` table).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    pub id: i64,
    pub site_name: String,
    pub site_url: String,
    pub cms_id: i64,
    pub schema_id: Option<i64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}
