//! Submission client: one work item in, one job handle out

use std::sync::Arc;

use crate::config::{DriverConfig, JobOptions};
use crate::error::Result;
use crate::remote::{BatchJobRequest, JobHandle, RemoteIngestService};

/// Turns work items into remote batch jobs under batch-wide configuration
///
/// Every field of the request except the prefix path is a batch-wide constant
/// fixed at construction; the work item's path is injected per call.
pub struct SubmissionClient {
    service: Arc<dyn RemoteIngestService>,
    source_container: String,
    extract_container: String,
    index_name: String,
    options: JobOptions,
}

impl SubmissionClient {
    /// Build a client for one batch targeting `index_name`
    pub fn new(
        service: Arc<dyn RemoteIngestService>,
        config: &DriverConfig,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            service,
            source_container: config.containers.source.clone(),
            extract_container: config.containers.extract.clone(),
            index_name: index_name.into(),
            options: config.job.clone(),
        }
    }

    /// Start remote processing of one work item. Returns the handle used for
    /// all subsequent status queries; does not wait for completion.
    ///
    /// Failure is surfaced to the caller immediately and the item is not
    /// enrolled anywhere.
    pub async fn submit(&self, work_item: &str) -> Result<JobHandle> {
        let request = BatchJobRequest {
            source_container: self.source_container.clone(),
            extract_container: self.extract_container.clone(),
            prefix_path: work_item.to_string(),
            index_name: self.index_name.clone(),
            options: self.options.clone(),
        };

        let handle = self.service.submit_batch_job(&request).await?;
        tracing::info!("Submitted '{}' -> {}", work_item, handle);
        Ok(handle)
    }

    /// Index this batch targets
    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}
