//! Remote ingestion service contract
//!
//! Transport-agnostic trait over the long-running-task service plus the shared
//! types that cross its boundary. The HTTP implementation lives in [`http`].

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::JobOptions;
use crate::error::Result;

pub use http::HttpIngestService;

/// Opaque reference to an in-flight remote job, returned at submission time
/// and used for all subsequent status queries. Never reused across work items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(status_query_uri: impl Into<String>) -> Self {
        Self(status_query_uri.into())
    }

    /// The status-query reference this handle wraps
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Primitive type tag for an index field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Double,
    Bool,
}

/// One batch job submission: batch-wide constants plus the per-item prefix path
#[derive(Debug, Clone)]
pub struct BatchJobRequest {
    /// Container holding the original documents
    pub source_container: String,
    /// Container receiving extracted content
    pub extract_container: String,
    /// Path of the work item within the source container
    pub prefix_path: String,
    /// Target index name (as returned by `create_index`)
    pub index_name: String,
    /// Processing options
    pub options: JobOptions,
}

/// Raw status answer for one job, in the remote's own vocabulary
#[derive(Debug, Clone)]
pub struct RemoteJobStatus {
    /// Runtime status label as reported by the service
    pub runtime_status: String,
    /// Output payload; carries error detail when the status denotes failure,
    /// and the index content for a finished sync job
    pub output: Option<serde_json::Value>,
}

/// One indexed-chunk record returned by a finished index sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Chunk text content
    #[serde(default)]
    pub content: String,
    /// Page the chunk was taken from
    #[serde(default, rename = "pagenumber")]
    pub page_number: Option<u32>,
    /// Source file name
    #[serde(default, rename = "sourcefile")]
    pub source_file: String,
    /// Source file path within its container
    #[serde(default, rename = "sourcepath")]
    pub source_path: String,
    /// Document category
    #[serde(default)]
    pub category: Option<String>,
}

/// Transport-agnostic contract of the remote ingestion service
///
/// Implementations:
/// - `HttpIngestService`: reqwest client against the hosted service
/// - test doubles in `#[cfg(test)]` modules
#[async_trait]
pub trait RemoteIngestService: Send + Sync {
    /// Create a search index from a stem name and field schema; returns the
    /// concrete generated index name (unique per call for the same stem)
    async fn create_index(
        &self,
        stem_name: &str,
        fields: &BTreeMap<String, FieldType>,
        embedding_dimensions: usize,
    ) -> Result<String>;

    /// List file identifiers in a container
    async fn list_files(&self, container: &str) -> Result<Vec<String>>;

    /// Start asynchronous processing of one work item; returns the handle used
    /// for status queries. Does not block for completion.
    async fn submit_batch_job(&self, request: &BatchJobRequest) -> Result<JobHandle>;

    /// One status round trip for an in-flight job
    async fn get_job_status(&self, handle: &JobHandle) -> Result<RemoteJobStatus>;

    /// Start synchronizing the index with the extract container; polled via
    /// `get_job_status` like any other job
    async fn sync_index(&self, index_name: &str, extract_container: &str) -> Result<JobHandle>;
}
