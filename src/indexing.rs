//! Index lifecycle adapters: index creation and sync-to-completion
//!
//! Index synchronization is itself a long-running remote job, polled with the
//! same fixed-interval, transient-tolerant policy the batch tracker uses.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{IndexConfig, PollConfig};
use crate::error::{Error, Result};
use crate::remote::{FieldType, IndexedChunk, RemoteIngestService};
use crate::tracker::JobStatus;

/// Field schema the ingestion service expects for chunk records
pub fn default_field_schema() -> BTreeMap<String, FieldType> {
    BTreeMap::from([
        ("content".to_string(), FieldType::String),
        ("pagenumber".to_string(), FieldType::Int),
        ("sourcefile".to_string(), FieldType::String),
        ("sourcepath".to_string(), FieldType::String),
        ("category".to_string(), FieldType::String),
    ])
}

/// Client for the index operations surrounding a batch run
pub struct IndexClient {
    service: Arc<dyn RemoteIngestService>,
    interval: Duration,
}

impl IndexClient {
    pub fn new(service: Arc<dyn RemoteIngestService>, polling: &PollConfig) -> Self {
        Self {
            service,
            interval: Duration::from_secs(polling.interval_secs),
        }
    }

    /// Create the target index with the default chunk schema. The service
    /// generates a fresh concrete name from the stem on every call.
    pub async fn create_index(&self, index: &IndexConfig) -> Result<String> {
        self.service
            .create_index(
                &index.stem_name,
                &default_field_schema(),
                index.embedding_dimensions,
            )
            .await
    }

    /// Synchronize the index with the extract container and wait for the sync
    /// job to finish, returning the indexed-chunk records it reports.
    ///
    /// Transient status-query failures are retried on the next poll; a failed
    /// sync job surfaces the remote error payload.
    pub async fn sync_to_completion(
        &self,
        index_name: &str,
        extract_container: &str,
    ) -> Result<Vec<IndexedChunk>> {
        let handle = self
            .service
            .sync_index(index_name, extract_container)
            .await?;
        tracing::info!("Index sync for '{}' started", index_name);

        loop {
            let remote = match self.service.get_job_status(&handle).await {
                Ok(remote) => remote,
                Err(e) => {
                    tracing::warn!("Sync status query failed, retrying: {}", e);
                    tokio::time::sleep(self.interval).await;
                    continue;
                }
            };

            match JobStatus::from_remote(&remote.runtime_status) {
                Some(JobStatus::Completed) => {
                    let chunks = decode_index_content(remote.output.as_ref())?;
                    tracing::info!(
                        "Index sync for '{}' completed with {} chunks",
                        index_name,
                        chunks.len()
                    );
                    return Ok(chunks);
                }
                Some(JobStatus::Failed) => {
                    let detail = remote
                        .output
                        .map(|o| o.to_string())
                        .unwrap_or_default();
                    return Err(Error::Remote(format!(
                        "Index sync for '{}' failed: {}",
                        index_name, detail
                    )));
                }
                Some(_) => {}
                None => {
                    tracing::warn!(
                        "Unknown sync status '{}', still polling",
                        remote.runtime_status
                    );
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Decode `output.index_content` from a finished sync job
fn decode_index_content(output: Option<&serde_json::Value>) -> Result<Vec<IndexedChunk>> {
    let Some(output) = output else {
        return Ok(Vec::new());
    };
    let Some(content) = output.get("index_content") else {
        return Ok(Vec::new());
    };
    serde_json::from_value(content.clone())
        .map_err(|e| Error::Remote(format!("Malformed index content: {}", e)))
}
