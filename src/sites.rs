//! Site registry.
//!
//! A site is a source CMS the harness knows about: where its bulk export
//! lives, which CMS it runs, and which stored schema currently describes it.
//! Sites start out `pending` and become `active` once a schema is linked.

use serde_json::{json, Value};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{Site, SiteSchema};
use crate::progress::ProgressReporter;
use crate::schema_store::{create_schema, CreateSchemaRequest};
use crate::source::SourceClient;
use crate::vector_store::VectorStore;
use crate::vectorize::{vectorize, VectorizeOptions, VectorizeReport};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone)]
pub struct NewSite {
    pub site_name: String,
    pub site_url: String,
    pub cms_id: i64,
}

fn row_to_site(row: &sqlx::sqlite::SqliteRow) -> Site {
    Site {
        id: row.get("id"),
        site_name: row.get("site_name"),
        site_url: row.get("site_url"),
        cms_id: row.get("cms_id"),
        schema_id: row.get("schema_id"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn add_site(pool: &SqlitePool, new: NewSite) -> Result<Site> {
    if new.site_name.trim().is_empty() {
        return Err(Error::InvalidArgument("site name must not be empty".into()));
    }
    if new.site_url.trim().is_empty() {
        return Err(Error::InvalidArgument("site url must not be empty".into()));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let id = sqlx::query(
        r#"
        INSERT INTO sites (site_name, site_url, cms_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.site_name.trim())
    .bind(new.site_url.trim())
    .bind(new.cms_id)
    .bind(STATUS_PENDING)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    info!(site_id = id, name = %new.site_name, "site added");
    get_site(pool, id).await
}

pub async fn get_site(pool: &SqlitePool, id: i64) -> Result<Site> {
    let row = sqlx::query(
        "SELECT id, site_name, site_url, cms_id, schema_id, status, created_at, updated_at FROM sites WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref()
        .map(row_to_site)
        .ok_or_else(|| Error::NotFound(format!("site {}", id)))
}

pub async fn list_sites(pool: &SqlitePool) -> Result<Vec<Site>> {
    let rows = sqlx::query(
        "SELECT id, site_name, site_url, cms_id, schema_id, status, created_at, updated_at FROM sites ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_site).collect())
}

/// Delete a site row. Schemas recorded for it are kept.
pub async fn remove_site(pool: &SqlitePool, id: i64) -> Result<()> {
    let affected = sqlx::query("DELETE FROM sites WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(Error::NotFound(format!("site {}", id)));
    }
    info!(site_id = id, "site removed");
    Ok(())
}

/// Point a site at a stored schema and mark it active.
pub async fn link_schema(pool: &SqlitePool, site_id: i64, schema_id: i64) -> Result<Site> {
    let now = chrono::Utc::now().to_rfc3339();
    let affected = sqlx::query(
        "UPDATE sites SET schema_id = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(schema_id)
    .bind(STATUS_ACTIVE)
    .bind(&now)
    .bind(site_id)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(Error::NotFound(format!("site {}", site_id)));
    }
    get_site(pool, site_id).await
}

/// Fetch a site's export, infer and store its schema, and link it.
pub async fn onboard_site(
    pool: &SqlitePool,
    source: &SourceClient,
    site_id: i64,
    created_by: &str,
) -> Result<(Site, SiteSchema)> {
    let site = get_site(pool, site_id).await?;
    let records = source.fetch_structure(&site.site_url).await?;

    let request = CreateSchemaRequest {
        site_id: Some(json!(site.id)),
        cms_id: Some(json!(site.cms_id)),
        example_payload: Some(Value::Array(records)),
        description: Some(json!(format!("Inferred from {}", site.site_url))),
        created_by: Some(json!(created_by)),
        ..Default::default()
    };
    let schema = create_schema(pool, request).await?;
    let site = link_schema(pool, site.id, schema.id).await?;

    info!(site_id = site.id, schema_id = schema.id, "site onboarded");
    Ok((site, schema))
}

/// Fetch a site's content and write it to the vector store.
pub async fn vectorize_site(
    pool: &SqlitePool,
    source: &SourceClient,
    store: &dyn VectorStore,
    options: &VectorizeOptions,
    site_id: i64,
    progress: &dyn ProgressReporter,
) -> Result<VectorizeReport> {
    let site = get_site(pool, site_id).await?;
    let nodes = source.fetch_content(&site.site_url).await?;
    vectorize(store, options, &site.site_name, &nodes, progress).await
}
