//! CLI command implementations.
//!
//! Each `run_*` function opens what it needs from [`Config`], calls into the
//! library, and prints its result on stdout. Logs and progress go to stderr.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::Site;
use crate::progress::ProgressMode;
use crate::schema::{coerce_record, schema_from_json, schema_to_json};
use crate::schema_store::{self, CreateSchemaRequest};
use crate::sites::{self, NewSite};
use crate::source::SourceClient;
use crate::vector_store::{VectorStore, WeaviateStore};
use crate::vectorize::VectorizeOptions;

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Open the database, creating tables if this is the first run.
async fn open_pool(config: &Config) -> Result<sqlx::SqlitePool> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    Ok(pool)
}

fn vector_store(config: &Config) -> Result<WeaviateStore> {
    if !config.vector_store.is_enabled() {
        bail!("vector_store.url is not set in the configuration");
    }
    Ok(WeaviateStore::from_config(&config.vector_store)?)
}

/// Print the schema that would be stored for an example payload file.
pub fn run_infer(path: &Path) -> Result<()> {
    let payload = read_json(path)?;
    let schema = schema_store::infer_site_schema(&payload)?;
    print_json(&schema)
}

pub async fn run_schema_create(
    config: &Config,
    site_id: i64,
    cms_id: i64,
    payload_path: &Path,
    created_by: &str,
    description: Option<String>,
    version: Option<String>,
) -> Result<()> {
    let pool = open_pool(config).await?;
    let request = CreateSchemaRequest {
        site_id: Some(site_id.into()),
        cms_id: Some(cms_id.into()),
        example_payload: Some(read_json(payload_path)?),
        created_by: Some(created_by.into()),
        description: description.map(Value::from),
        version: version.map(Value::from),
        ..Default::default()
    };
    let stored = schema_store::create_schema(&pool, request).await?;
    println!(
        "Created schema {} for site {} ({} v{})",
        stored.id, stored.site_id, stored.created_by, stored.version
    );
    Ok(())
}

pub async fn run_schema_list(config: &Config, site_id: i64) -> Result<()> {
    let pool = open_pool(config).await?;
    let schemas = schema_store::list_schemas(&pool, site_id).await?;
    if schemas.is_empty() {
        println!("No schemas for site {}.", site_id);
        return Ok(());
    }

    println!("{:<6} {:<8} {:<10} {:<16} CREATED", "ID", "CMS", "VERSION", "BY");
    for s in &schemas {
        println!(
            "{:<6} {:<8} {:<10} {:<16} {}",
            s.id, s.cms_id, s.version, s.created_by, s.created_at
        );
    }
    Ok(())
}

pub async fn run_schema_show(config: &Config, id: i64) -> Result<()> {
    let pool = open_pool(config).await?;
    let stored = schema_store::get_schema(&pool, id).await?;
    let schema = schema_from_json(&stored.schema_json)?;

    println!("--- Schema {} ---", stored.id);
    println!("site_id:     {}", stored.site_id);
    println!("cms_id:      {}", stored.cms_id);
    println!("version:     {}", stored.version);
    println!("created_by:  {}", stored.created_by);
    println!("created_at:  {}", stored.created_at);
    if !stored.description.is_empty() {
        println!("description: {}", stored.description);
    }
    println!();
    println!("--- Fields ({}) ---", schema.len());
    println!("{}", schema_to_json(&schema)?);
    Ok(())
}

/// Coerce an exported record (or every record of an export) with a stored schema.
pub async fn run_schema_apply(config: &Config, id: i64, records_path: &Path) -> Result<()> {
    let pool = open_pool(config).await?;
    let stored = schema_store::get_schema(&pool, id).await?;
    let schema = schema_from_json(&stored.schema_json)?;

    let coerced = match read_json(records_path)? {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|record| coerce_record(&schema, record))
                .collect(),
        ),
        record => coerce_record(&schema, &record),
    };
    print_json(&coerced)
}

fn print_site(site: &Site) {
    println!(
        "{:<6} {:<20} {:<8} {:<8} {}",
        site.id,
        site.site_name,
        site.status,
        site.schema_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
        site.site_url
    );
}

pub async fn run_site_add(config: &Config, name: &str, url: &str, cms_id: i64) -> Result<()> {
    let pool = open_pool(config).await?;
    let site = sites::add_site(
        &pool,
        NewSite {
            site_name: name.to_string(),
            site_url: url.to_string(),
            cms_id,
        },
    )
    .await?;
    println!("Added site {} ({})", site.id, site.site_name);
    Ok(())
}

pub async fn run_site_list(config: &Config) -> Result<()> {
    let pool = open_pool(config).await?;
    let all = sites::list_sites(&pool).await?;
    if all.is_empty() {
        println!("No sites registered.");
        return Ok(());
    }
    println!("{:<6} {:<20} {:<8} {:<8} URL", "ID", "NAME", "STATUS", "SCHEMA");
    for site in &all {
        print_site(site);
    }
    Ok(())
}

pub async fn run_site_remove(config: &Config, id: i64) -> Result<()> {
    let pool = open_pool(config).await?;
    sites::remove_site(&pool, id).await?;
    println!("Removed site {}", id);
    Ok(())
}

pub async fn run_site_onboard(config: &Config, id: i64, created_by: &str) -> Result<()> {
    let pool = open_pool(config).await?;
    let source = SourceClient::new(&config.source)?;
    let (site, schema) = sites::onboard_site(&pool, &source, id, created_by).await?;
    println!(
        "Site {} ({}) is {} with schema {}",
        site.id, site.site_name, site.status, schema.id
    );
    Ok(())
}

pub async fn run_vectorize(config: &Config, site_id: i64, mode: ProgressMode) -> Result<()> {
    let pool = open_pool(config).await?;
    let source = SourceClient::new(&config.source)?;
    let store = vector_store(config)?;
    let reporter = mode.reporter();

    let report = sites::vectorize_site(
        &pool,
        &source,
        &store,
        &VectorizeOptions::from_config(&config.vector_store),
        site_id,
        reporter.as_ref(),
    )
    .await?;

    print_json(&report)
}

pub async fn run_vector_store_check(config: &Config) -> Result<()> {
    let store = vector_store(config)?;
    if store.is_ready().await? {
        println!("Weaviate is ready.");
        Ok(())
    } else {
        bail!("Weaviate is not ready at {}", config.vector_store.url)
    }
}

pub async fn run_ensure_class(config: &Config) -> Result<()> {
    let store = vector_store(config)?;
    let class_name = &config.vector_store.class_name;
    if store.ensure_class(class_name).await? {
        println!("Created class {}.", class_name);
    } else {
        println!("Class {} already exists.", class_name);
    }
    Ok(())
}
