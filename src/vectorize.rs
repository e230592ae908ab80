//! Content vectorization.
//!
//! Writes content nodes to the vector store one at a time. Nodes are walked
//! in fixed-size batches, but every write inside a batch is still awaited
//! before the next one starts, so batching groups the work without adding
//! parallelism. Progress is therefore monotonic.
//!
//! A failed write is logged and recorded; it never aborts the run and is
//! never retried. The run summary is a pure fold over the per-item outcomes
//! ([`VectorizationRun::from_outcomes`]).

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::VectorStoreConfig;
use crate::error::{Error, Result};
use crate::models::{ContentNode, VectorObject, VectorProperties};
use crate::progress::{percent, ProgressReporter, VectorizeProgress};
use crate::text::clean_body_text;
use crate::vector_store::VectorStore;

#[derive(Debug, Clone)]
pub struct VectorizeOptions {
    pub class_name: String,
    pub batch_size: usize,
}

impl VectorizeOptions {
    pub fn from_config(config: &VectorStoreConfig) -> Self {
        Self {
            class_name: config.class_name.clone(),
            batch_size: config.batch_size,
        }
    }
}

impl Default for VectorizeOptions {
    fn default() -> Self {
        Self::from_config(&VectorStoreConfig::default())
    }
}

/// `"1"` is published; every other flag value is unpublished.
pub fn status_label(status: &str) -> &'static str {
    if status == "1" {
        "published"
    } else {
        "unpublished"
    }
}

/// Build the vector-store object for a node. The body is cleaned here so
/// every write sees identical text processing.
pub fn to_vector_object(node: &ContentNode, class_name: &str) -> VectorObject {
    VectorObject {
        class: class_name.to_string(),
        properties: VectorProperties {
            nid: node.nid.clone(),
            title: node.title.clone(),
            body: clean_body_text(&node.body),
            created: node.created.clone(),
            status: status_label(&node.status).to_string(),
            node_type: node.node_type.clone(),
        },
    }
}

/// Result of writing one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub nid: String,
    /// Object id on success, failure reason otherwise.
    pub result: std::result::Result<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenObject {
    pub id: String,
    pub nid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub nid: String,
    pub reason: String,
}

/// In-memory summary of one vectorize call. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizationRun {
    pub total: usize,
    pub processed: usize,
    pub succeeded: Vec<WrittenObject>,
    pub failed: Vec<FailedItem>,
    pub progress_percent: u8,
}

impl VectorizationRun {
    pub fn from_outcomes(total: usize, outcomes: &[ItemOutcome]) -> Self {
        let (succeeded, failed) = outcomes.iter().fold(
            (Vec::new(), Vec::new()),
            |(mut ok, mut err), outcome| {
                match &outcome.result {
                    Ok(id) => ok.push(WrittenObject {
                        id: id.clone(),
                        nid: outcome.nid.clone(),
                    }),
                    Err(reason) => err.push(FailedItem {
                        nid: outcome.nid.clone(),
                        reason: reason.clone(),
                    }),
                }
                (ok, err)
            },
        );

        Self {
            total,
            processed: outcomes.len(),
            succeeded,
            failed,
            progress_percent: percent(outcomes.len(), total),
        }
    }
}

/// What the caller gets back. Zero successes is still a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorizeReport {
    pub objects_created: usize,
    pub site_name: String,
    pub total: usize,
    pub succeeded: Vec<WrittenObject>,
    pub failed: Vec<FailedItem>,
}

impl VectorizeReport {
    fn from_run(site_name: &str, run: VectorizationRun) -> Self {
        Self {
            objects_created: run.succeeded.len(),
            site_name: site_name.to_string(),
            total: run.total,
            succeeded: run.succeeded,
            failed: run.failed,
        }
    }
}

/// Write every node to the vector store, strictly in order.
///
/// # Errors
///
/// [`Error::NoContent`] when `nodes` is empty. Individual write failures are
/// not errors; they show up in [`VectorizeReport::failed`].
pub async fn vectorize(
    store: &dyn VectorStore,
    options: &VectorizeOptions,
    site_name: &str,
    nodes: &[ContentNode],
    progress: &dyn ProgressReporter,
) -> Result<VectorizeReport> {
    if nodes.is_empty() {
        return Err(Error::NoContent);
    }

    let total = nodes.len();
    let mut outcomes: Vec<ItemOutcome> = Vec::with_capacity(total);

    for batch in nodes.chunks(options.batch_size.max(1)) {
        for node in batch {
            let object = to_vector_object(node, &options.class_name);
            let result = store
                .write_object(&object)
                .await
                .map_err(|e| e.to_string());

            if let Err(reason) = &result {
                warn!(nid = %node.nid, %reason, "failed to vectorize item");
            }

            outcomes.push(ItemOutcome {
                nid: node.nid.clone(),
                result,
            });
            progress.report(VectorizeProgress::new(outcomes.len(), total));
        }
    }

    let run = VectorizationRun::from_outcomes(total, &outcomes);
    info!(
        site = site_name,
        total,
        created = run.succeeded.len(),
        failed = run.failed.len(),
        "vectorization finished"
    );
    Ok(VectorizeReport::from_run(site_name, run))
}

// ============ Direct object writes ============

/// Body accepted by the object-write endpoint: a batch or a single object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WriteRequest {
    Batch { objects: Vec<WriteObject> },
    Single { class: String, properties: VectorProperties },
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteObject {
    #[serde(default)]
    pub class: Option<String>,
    pub properties: VectorProperties,
}

impl WriteRequest {
    pub fn parse(body: serde_json::Value) -> Result<Self> {
        serde_json::from_value(body).map_err(|_| {
            Error::InvalidArgument(
                "Invalid request format. Expected either single object or batch operation"
                    .to_string(),
            )
        })
    }

    fn into_objects(self, default_class: &str) -> Vec<VectorObject> {
        let objects = match self {
            WriteRequest::Batch { objects } => objects,
            WriteRequest::Single { class, properties } => vec![WriteObject {
                class: Some(class),
                properties,
            }],
        };

        objects
            .into_iter()
            .map(|o| VectorObject {
                class: o
                    .class
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| default_class.to_string()),
                properties: o.properties,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteResult {
    pub id: String,
    pub nid: String,
    pub status: &'static str,
}

/// Write pre-built objects in order, stopping at the first failure.
pub async fn write_objects(
    store: &dyn VectorStore,
    request: WriteRequest,
    default_class: &str,
) -> Result<Vec<WriteResult>> {
    let mut results = Vec::new();
    for object in request.into_objects(default_class) {
        let id = store.write_object(&object).await.map_err(|e| match e {
            e @ Error::VectorStore(_) => e,
            other => Error::VectorStore(other.to_string()),
        })?;
        info!(%id, nid = %object.properties.nid, "vector object created");
        results.push(WriteResult {
            id,
            nid: object.properties.nid,
            status: "created",
        });
    }
    Ok(results)
}
