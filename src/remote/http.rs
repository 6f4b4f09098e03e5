//! HTTP client for the remote ingestion service
//!
//! Thin reqwest adapter over the service's JSON API. Every request carries the
//! routing key as the `code` query parameter; status-query URIs returned by the
//! service are used verbatim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{BatchJobRequest, FieldType, JobHandle, RemoteIngestService, RemoteJobStatus};
use crate::config::ServiceConfig;
use crate::error::{Error, Result};

/// HTTP implementation of the remote ingestion service contract
pub struct HttpIngestService {
    client: reqwest::Client,
    base_url: String,
    routing_key: String,
}

impl HttpIngestService {
    /// Create a client from the service configuration
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            routing_key: config.routing_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Attach the routing key to a request
    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.query(&[("code", self.routing_key.as_str())])
    }
}

#[async_trait]
impl RemoteIngestService for HttpIngestService {
    async fn create_index(
        &self,
        stem_name: &str,
        fields: &BTreeMap<String, FieldType>,
        embedding_dimensions: usize,
    ) -> Result<String> {
        let request = CreateIndexRequest {
            stem_name: stem_name.to_string(),
            fields: fields.clone(),
            embedding_dimensions,
        };

        let response = self
            .with_key(self.client.post(self.endpoint("indexes")))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("Create index request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!(
                "Create index failed ({}): {}",
                status, body
            )));
        }

        let created: CreateIndexResponse = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("Failed to parse create index response: {}", e)))?;

        tracing::info!("Created index '{}' from stem '{}'", created.index_name, stem_name);

        Ok(created.index_name)
    }

    async fn list_files(&self, container: &str) -> Result<Vec<String>> {
        let response = self
            .with_key(
                self.client
                    .get(self.endpoint(&format!("containers/{}/files", container))),
            )
            .send()
            .await
            .map_err(|e| Error::Remote(format!("List files request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!(
                "List files for '{}' failed ({}): {}",
                container, status, body
            )));
        }

        let listing: ListFilesResponse = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("Failed to parse file listing: {}", e)))?;

        Ok(listing.files)
    }

    async fn submit_batch_job(&self, request: &BatchJobRequest) -> Result<JobHandle> {
        let body = SubmitJobRequest {
            source_container: request.source_container.clone(),
            extract_container: request.extract_container.clone(),
            prefix_path: request.prefix_path.clone(),
            index_name: request.index_name.clone(),
            delete_after_ingest: request.options.delete_after_ingest,
            image_analysis: request.options.image_analysis,
            chunking_strategy: request.options.chunking_strategy.clone(),
            max_chunk_size: request.options.max_chunk_size,
            chunk_overlap: request.options.chunk_overlap,
            enable_logging: request.options.enable_logging,
        };

        let response = self
            .with_key(self.client.post(self.endpoint("jobs")))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::submission(&request.prefix_path, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::submission(
                &request.prefix_path,
                format!("service returned {}: {}", status, body),
            ));
        }

        let accepted: SubmitJobResponse = response
            .json()
            .await
            .map_err(|e| Error::submission(&request.prefix_path, format!("malformed response: {}", e)))?;

        // A submission without a status-query reference cannot be tracked
        let uri = accepted.status_query_get_uri.ok_or_else(|| {
            Error::submission(&request.prefix_path, "response missing statusQueryGetUri")
        })?;

        Ok(JobHandle::new(uri))
    }

    async fn get_job_status(&self, handle: &JobHandle) -> Result<RemoteJobStatus> {
        // The status-query URI is self-contained; no key is appended
        let response = self
            .client
            .get(handle.as_str())
            .send()
            .await
            .map_err(|e| Error::Probe(format!("status request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Probe(format!(
                "status query returned {}: {}",
                status, body
            )));
        }

        let status: JobStatusResponse = response
            .json()
            .await
            .map_err(|e| Error::Probe(format!("malformed status response: {}", e)))?;

        Ok(RemoteJobStatus {
            runtime_status: status.runtime_status,
            output: status.output,
        })
    }

    async fn sync_index(&self, index_name: &str, extract_container: &str) -> Result<JobHandle> {
        let body = SyncIndexRequest {
            extract_container: extract_container.to_string(),
        };

        let response = self
            .with_key(
                self.client
                    .post(self.endpoint(&format!("indexes/{}/sync", index_name))),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("Sync index request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!(
                "Sync index '{}' failed ({}): {}",
                index_name, status, body
            )));
        }

        let accepted: SubmitJobResponse = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("Failed to parse sync response: {}", e)))?;

        let uri = accepted
            .status_query_get_uri
            .ok_or_else(|| Error::Remote("sync response missing statusQueryGetUri".to_string()))?;

        Ok(JobHandle::new(uri))
    }
}

// ============================================================================
// API Request/Response types
// ============================================================================

#[derive(Serialize)]
struct CreateIndexRequest {
    #[serde(rename = "stemName")]
    stem_name: String,
    fields: BTreeMap<String, FieldType>,
    #[serde(rename = "embeddingDimensions")]
    embedding_dimensions: usize,
}

#[derive(Deserialize)]
struct CreateIndexResponse {
    #[serde(rename = "indexName")]
    index_name: String,
}

#[derive(Deserialize)]
struct ListFilesResponse {
    files: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitJobRequest {
    source_container: String,
    extract_container: String,
    prefix_path: String,
    index_name: String,
    delete_after_ingest: bool,
    image_analysis: bool,
    chunking_strategy: String,
    max_chunk_size: usize,
    chunk_overlap: usize,
    enable_logging: bool,
}

#[derive(Deserialize)]
struct SubmitJobResponse {
    #[serde(rename = "statusQueryGetUri")]
    status_query_get_uri: Option<String>,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    #[serde(rename = "runtimeStatus")]
    runtime_status: String,
    output: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncIndexRequest {
    extract_container: String,
}
