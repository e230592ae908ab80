//! TOML configuration.
//!
//! Loaded once at process start and passed explicitly into the database pool,
//! the vector-store client, and the source-CMS client. Secrets are never
//! stored in the file; `[vector_store].api_key_env` names the environment
//! variable that holds the bearer token.
//!
//! ```toml
//! [db]
//! path = "./data/cmsh.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [vector_store]
//! url = "https://example.weaviate.cloud"
//! class_name = "IntelligensiAi"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    /// Base URL of the vector store; empty disables vectorization.
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Class written when an object does not name one.
    #[serde(default = "default_class_name")]
    pub class_name: String,
    /// Per-request timeout. Server-side vectorization is slow, keep this generous.
    #[serde(default = "default_vector_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key_env: default_api_key_env(),
            class_name: default_class_name(),
            timeout_secs: default_vector_timeout_secs(),
            batch_size: default_batch_size(),
        }
    }
}

impl VectorStoreConfig {
    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

fn default_api_key_env() -> String {
    "WEAVIATE_API_KEY".to_string()
}
fn default_class_name() -> String {
    "IntelligensiAi".to_string()
}
fn default_vector_timeout_secs() -> u64 {
    30
}
fn default_batch_size() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
    /// Legacy sites frequently run with self-signed certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_source_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

fn default_source_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.vector_store.batch_size == 0 {
        anyhow::bail!("vector_store.batch_size must be > 0");
    }

    if config.vector_store.timeout_secs == 0 {
        anyhow::bail!("vector_store.timeout_secs must be > 0");
    }

    if config.vector_store.class_name.trim().is_empty() {
        anyhow::bail!("vector_store.class_name must not be empty");
    }

    if config.vector_store.is_enabled()
        && !(config.vector_store.url.starts_with("http://")
            || config.vector_store.url.starts_with("https://"))
    {
        anyhow::bail!(
            "vector_store.url must start with http:// or https://, got '{}'",
            config.vector_store.url
        );
    }

    if config.source.timeout_secs == 0 {
        anyhow::bail!("source.timeout_secs must be > 0");
    }

    Ok(config)
}
