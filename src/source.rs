//! Source CMS client.
//!
//! Reads content from a site's bulk-export endpoint (`GET <site>/api/bulk-export`).
//! The endpoint returns either a bare JSON array of nodes or an object with a
//! `structure` array; both are accepted.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::models::ContentNode;

const BULK_EXPORT_PATH: &str = "/api/bulk-export";

/// Build the bulk-export URL for a site.
///
/// Schemeless URLs get `https://`; one trailing slash is removed.
///
/// ```
/// use cms_harness::source::bulk_export_url;
/// assert_eq!(
///     bulk_export_url("example.com/"),
///     "https://example.com/api/bulk-export"
/// );
/// ```
pub fn bulk_export_url(site_url: &str) -> String {
    let mut url = site_url.trim().to_string();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        url = format!("https://{}", url);
    }
    if url.ends_with('/') {
        url.pop();
    }
    format!("{}{}", url, BULK_EXPORT_PATH)
}

pub struct SourceClient {
    client: Client,
}

impl SourceClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch the raw exported records for a site.
    pub async fn fetch_structure(&self, site_url: &str) -> Result<Vec<Value>> {
        let url = bulk_export_url(site_url);
        debug!(%url, "fetching bulk export");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Source(format!(
                "Server returned {} for {}",
                status, url
            )));
        }

        let body: Value = resp.json().await?;
        let records = structure_records(body)?;
        info!(%url, records = records.len(), "bulk export fetched");
        Ok(records)
    }

    /// Fetch the site's content as typed nodes. Records that do not look like
    /// content nodes (non-objects) are skipped.
    pub async fn fetch_content(&self, site_url: &str) -> Result<Vec<ContentNode>> {
        let records = self.fetch_structure(site_url).await?;
        Ok(records
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|record| serde_json::from_value(record).ok())
            .collect())
    }
}

/// Unwrap a bulk-export body into its record list.
pub fn structure_records(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("structure") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(Error::Source(
                "bulk export `structure` is not an array".to_string(),
            )),
        },
        _ => Err(Error::Source(
            "bulk export returned neither an array nor an object".to_string(),
        )),
    }
}
