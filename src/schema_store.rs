//! Schema persistence.
//!
//! Turns a `createSchema` request into a stored [`SiteSchema`] row. Requests
//! may spell their fields in snake_case or camelCase; [`CreateSchemaRequest::normalize`]
//! merges both spellings into one [`NewSchema`] before any validation runs.
//!
//! Every call inserts a new row. Existing schemas for the same site are
//! neither checked nor replaced.

use serde::Deserialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::coerce::coerce_number;
use crate::error::{Error, Result};
use crate::models::SiteSchema;
use crate::schema::{
    build_schema, coerce_numeric_fields, extract_inference_target, force_numeric_fields,
    schema_to_json, SchemaMap,
};

const DEFAULT_VERSION: &str = "1.0.0";

/// Raw request body, accepting both spellings of every field.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreateSchemaRequest {
    #[serde(default)]
    pub site_id: Option<Value>,
    #[serde(default, rename = "siteId")]
    pub site_id_alt: Option<Value>,
    #[serde(default)]
    pub cms_id: Option<Value>,
    #[serde(default, rename = "cmsId")]
    pub cms_id_alt: Option<Value>,
    #[serde(default)]
    pub example_payload: Option<Value>,
    #[serde(default, rename = "examplePayload")]
    pub example_payload_alt: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub created_by: Option<Value>,
    #[serde(default, rename = "createdBy")]
    pub created_by_alt: Option<Value>,
}

/// Canonical, validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSchema {
    pub site_id: i64,
    pub cms_id: i64,
    pub example_payload: Value,
    pub description: String,
    pub version: String,
    pub created_by: String,
}

/// First non-null of the two spellings. `null` counts as absent.
pub(crate) fn first_non_null(primary: Option<Value>, alternate: Option<Value>) -> Option<Value> {
    primary
        .filter(|v| !v.is_null())
        .or_else(|| alternate.filter(|v| !v.is_null()))
}

/// Accepts JSON integers and integral numeric strings (`7`, `"7"`, `" 7 "`).
pub(crate) fn integral_id(value: Option<&Value>) -> Option<i64> {
    let n = coerce_number(value?)?;
    (n.is_finite() && n.fract() == 0.0).then_some(n as i64)
}

/// Mirrors JavaScript truthiness for the payload check.
fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

impl CreateSchemaRequest {
    /// Merge alternate spellings, apply defaults, and validate.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when `site_id`/`cms_id` are not integral
    /// numbers, the payload is missing, or `created_by` is not a string.
    pub fn normalize(self) -> Result<NewSchema> {
        let site_id = first_non_null(self.site_id, self.site_id_alt);
        let cms_id = first_non_null(self.cms_id, self.cms_id_alt);
        let payload = first_non_null(self.example_payload, self.example_payload_alt);
        let created_by = first_non_null(self.created_by, self.created_by_alt);

        let site_id = integral_id(site_id.as_ref());
        let cms_id = integral_id(cms_id.as_ref());
        let created_by = match created_by {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        };

        match (site_id, cms_id, payload, created_by) {
            (Some(site_id), Some(cms_id), Some(payload), Some(created_by))
                if !is_empty_payload(&payload) =>
            {
                Ok(NewSchema {
                    site_id,
                    cms_id,
                    example_payload: payload,
                    description: text_field(self.description).unwrap_or_default(),
                    version: text_field(self.version)
                        .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
                    created_by,
                })
            }
            (site_id, cms_id, payload, created_by) => {
                debug!(
                    ?site_id,
                    ?cms_id,
                    payload_present = payload.is_some(),
                    ?created_by,
                    "createSchema validation failed"
                );
                Err(Error::InvalidArgument(
                    "Request missing fields: siteId, cmsId, payload, createdBy".to_string(),
                ))
            }
        }
    }
}

/// Free-text column value: strings as-is, other scalars in their JSON form.
/// `null` counts as absent.
fn text_field(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Infer the schema that would be stored for `payload`, without storing it.
///
/// Extracts the inference target, coerces allowlisted numeric fields a
/// second time, builds the schema, and marks allowlisted fields as coercing
/// numbers regardless of what inference produced for them.
pub fn infer_site_schema(payload: &Value) -> Result<SchemaMap> {
    let target = extract_inference_target(payload)?;

    let mut record = target.clone();
    coerce_numeric_fields(&mut record);

    let mut schema = build_schema(&Value::Object(record))?;
    force_numeric_fields(&mut schema);
    Ok(schema)
}

/// Validate, infer, and insert one schema row.
pub async fn create_schema(pool: &SqlitePool, request: CreateSchemaRequest) -> Result<SiteSchema> {
    let new_schema = request.normalize()?;
    let schema = infer_site_schema(&new_schema.example_payload)?;
    let schema_json = schema_to_json(&schema)?;

    let stored = insert_schema(pool, &new_schema, &schema_json).await?;
    info!(
        schema_id = stored.id,
        site_id = stored.site_id,
        fields = schema.len(),
        "schema created"
    );
    Ok(stored)
}

async fn insert_schema(pool: &SqlitePool, new: &NewSchema, schema_json: &str) -> Result<SiteSchema> {
    let now = chrono::Utc::now().to_rfc3339();

    let id = sqlx::query(
        r#"
        INSERT INTO schemas (site_id, cms_id, schema_json, description, version, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.site_id)
    .bind(new.cms_id)
    .bind(schema_json)
    .bind(&new.description)
    .bind(&new.version)
    .bind(&new.created_by)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(|e| Error::Internal(format!("Failed to store schema: {}", e)))?
    .last_insert_rowid();

    get_schema(pool, id).await
}

fn row_to_schema(row: &sqlx::sqlite::SqliteRow) -> SiteSchema {
    SiteSchema {
        id: row.get("id"),
        site_id: row.get("site_id"),
        cms_id: row.get("cms_id"),
        schema_json: row.get("schema_json"),
        description: row.get("description"),
        version: row.get("version"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn get_schema(pool: &SqlitePool, id: i64) -> Result<SiteSchema> {
    let row = sqlx::query(
        "SELECT id, site_id, cms_id, schema_json, description, version, created_by, created_at, updated_at FROM schemas WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref()
        .map(row_to_schema)
        .ok_or_else(|| Error::NotFound(format!("schema {}", id)))
}

/// All schemas recorded for a site, newest first.
pub async fn list_schemas(pool: &SqlitePool, site_id: i64) -> Result<Vec<SiteSchema>> {
    let rows = sqlx::query(
        "SELECT id, site_id, cms_id, schema_json, description, version, created_by, created_at, updated_at FROM schemas WHERE site_id = ? ORDER BY id DESC",
    )
    .bind(site_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_schema).collect())
}
