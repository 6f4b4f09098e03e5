//! Configuration for the batch ingestion driver

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main driver configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DriverConfig {
    /// Remote service configuration
    pub service: ServiceConfig,
    /// Blob container configuration
    pub containers: ContainerConfig,
    /// Search index configuration
    pub index: IndexConfig,
    /// Batch-wide job options (constant across the batch; the per-item
    /// prefix path is injected per submission)
    #[serde(default)]
    pub job: JobOptions,
    /// Polling configuration
    #[serde(default)]
    pub polling: PollConfig,
}

impl DriverConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }
}

/// Remote ingestion service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the ingestion service
    pub base_url: String,
    /// Routing key attached to every request as the `code` query parameter
    pub routing_key: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7071/api".to_string(),
            routing_key: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// Source and extract containers for the batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Container holding the original documents
    pub source: String,
    /// Container receiving the extracted per-page content
    pub extract: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            source: "documents".to_string(),
            extract: "extracts".to_string(),
        }
    }
}

/// Search index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Stem used by the service to generate the concrete index name
    pub stem_name: String,
    /// Embedding dimensions for vector fields
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            stem_name: "docbatch".to_string(),
            embedding_dimensions: default_embedding_dimensions(),
        }
    }
}

fn default_embedding_dimensions() -> usize {
    3072
}

/// Processing options sent with every batch job submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOptions {
    /// Delete source blobs after successful ingestion
    #[serde(default)]
    pub delete_after_ingest: bool,
    /// Run image analysis on embedded figures
    #[serde(default)]
    pub image_analysis: bool,
    /// Chunking strategy tag understood by the service
    #[serde(default = "default_chunking_strategy")]
    pub chunking_strategy: String,
    /// Maximum chunk size in tokens
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Overlap between consecutive chunks in tokens
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Enable verbose logging on the service side
    #[serde(default)]
    pub enable_logging: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            delete_after_ingest: false,
            image_analysis: false,
            chunking_strategy: default_chunking_strategy(),
            max_chunk_size: default_max_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            enable_logging: false,
        }
    }
}

fn default_chunking_strategy() -> String {
    "page".to_string()
}

fn default_max_chunk_size() -> usize {
    2048
}

fn default_chunk_overlap() -> usize {
    128
}

/// Convergence loop polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between polling rounds in seconds
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    10
}
