//! Vector-store client.
//!
//! The [`VectorStore`] trait is the seam the vectorizer writes through; the
//! production implementation, [`WeaviateStore`], talks to a Weaviate instance
//! over its REST API:
//!
//! | Method | Path | Used by |
//! |--------|------|---------|
//! | `POST` | `/v1/objects` | [`VectorStore::write_object`] |
//! | `GET`  | `/v1/.well-known/ready` | [`VectorStore::is_ready`] |
//! | `GET`/`POST` | `/v1/schema` | [`VectorStore::ensure_class`] |
//!
//! Writes are never retried here. A non-2xx response is reported as a failed
//! write and the caller decides what to do with it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::VectorStoreConfig;
use crate::error::{Error, Result};
use crate::models::VectorObject;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Write one object and return the id the store assigned to it.
    async fn write_object(&self, object: &VectorObject) -> Result<String>;

    async fn is_ready(&self) -> Result<bool>;

    /// Create the content class if missing. `true` when it was created.
    async fn ensure_class(&self, class_name: &str) -> Result<bool>;
}

pub struct WeaviateStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Deserialize)]
struct SchemaListing {
    #[serde(default)]
    classes: Vec<ClassEntry>,
}

#[derive(Deserialize)]
struct ClassEntry {
    class: String,
}

impl WeaviateStore {
    /// Build a client from configuration, reading the API key from the
    /// environment variable named by `api_key_env` (absent key → no auth header).
    pub fn from_config(config: &VectorStoreConfig) -> Result<Self> {
        if !config.is_enabled() {
            return Err(Error::InvalidArgument(
                "vector_store.url is not configured".to_string(),
            ));
        }
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(&config.url, api_key, Duration::from_secs(config.timeout_secs))
    }

    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// Class definition for CMS content, vectorized server-side with OpenAI.
pub fn class_definition(class_name: &str) -> serde_json::Value {
    let property = |name: &str, data_type: &str, description: &str| {
        serde_json::json!({
            "name": name,
            "dataType": [data_type],
            "description": description,
        })
    };

    serde_json::json!({
        "class": class_name,
        "description": "CMS content with OpenAI embeddings for semantic search",
        "vectorizer": "text2vec-openai",
        "moduleConfig": {
            "text2vec-openai": {
                "model": "text-embedding-3-small",
                "type": "text",
            }
        },
        "properties": [
            property("nid", "string", "Unique node ID from the source CMS"),
            property("title", "text", "Content title"),
            property("body", "text", "Main content body"),
            property("created", "string", "Creation timestamp"),
            property("status", "string", "Published status"),
            property("type", "string", "Content type"),
        ],
    })
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn write_object(&self, object: &VectorObject) -> Result<String> {
        let resp = self
            .authorized(self.client.post(format!("{}/v1/objects", self.base_url)))
            .json(object)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::VectorStore(format!("{}: {}", status, body)));
        }

        let created: CreatedObject = resp.json().await?;
        Ok(created.id)
    }

    /// Readiness probe.
    async fn is_ready(&self) -> Result<bool> {
        let resp = self
            .authorized(self.client.get(format!("{}/v1/.well-known/ready", self.base_url)))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    async fn ensure_class(&self, class_name: &str) -> Result<bool> {
        let resp = self
            .authorized(self.client.get(format!("{}/v1/schema", self.base_url)))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::VectorStore(format!(
                "schema listing failed {}: {}",
                status, body
            )));
        }

        let listing: SchemaListing = resp.json().await?;
        if listing.classes.iter().any(|c| c.class == class_name) {
            debug!(class = class_name, "vector class already exists");
            return Ok(false);
        }

        let resp = self
            .authorized(self.client.post(format!("{}/v1/schema", self.base_url)))
            .json(&class_definition(class_name))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::VectorStore(format!(
                "class creation failed {}: {}",
                status, body
            )));
        }

        info!(class = class_name, "vector class created");
        Ok(true)
    }
}
