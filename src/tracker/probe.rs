//! Status prober: one normalized status round trip per job

use async_trait::async_trait;
use std::sync::Arc;

use super::status::JobStatus;
use crate::error::Result;
use crate::remote::{JobHandle, RemoteIngestService};

/// Normalized result of one status query
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Status after vocabulary normalization
    pub status: JobStatus,
    /// Error detail extracted from the job output; populated only when the
    /// status is `Failed`, empty string when the service gave no detail
    pub error: Option<String>,
}

/// Seam between the batch tracker and the remote status endpoint
///
/// Implementations:
/// - `StatusProber`: queries the remote service
/// - scripted doubles in tests
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Query the job once and normalize the answer.
    ///
    /// An `Err` means the query itself could not be completed (transport
    /// failure). Callers treat that as transient: the prior status is kept
    /// and the probe is retried next round. Job-level failure is a successful
    /// probe with `status == Failed`.
    async fn probe(&self, handle: &JobHandle) -> Result<StatusSnapshot>;
}

/// Status prober backed by the remote ingestion service
pub struct StatusProber {
    service: Arc<dyn RemoteIngestService>,
}

impl StatusProber {
    pub fn new(service: Arc<dyn RemoteIngestService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl StatusProbe for StatusProber {
    async fn probe(&self, handle: &JobHandle) -> Result<StatusSnapshot> {
        let remote = self.service.get_job_status(handle).await?;

        let status = match JobStatus::from_remote(&remote.runtime_status) {
            Some(status) => status,
            None => {
                // Fail-safe: keep polling rather than silently drop the item
                tracing::warn!(
                    "Unknown runtime status '{}' for {}, treating as non-terminal",
                    remote.runtime_status,
                    handle
                );
                JobStatus::Running
            }
        };

        let error = if status == JobStatus::Failed {
            Some(extract_error_detail(remote.output.as_ref()))
        } else {
            None
        };

        Ok(StatusSnapshot { status, error })
    }
}

/// Pull error detail out of a failed job's output field
fn extract_error_detail(output: Option<&serde_json::Value>) -> String {
    match output {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(value) => value
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::remote::{BatchJobRequest, FieldType, RemoteJobStatus};
    use std::collections::BTreeMap;
    use tokio::sync::Mutex;

    /// Remote service double that replays a scripted status sequence
    struct ScriptedService {
        responses: Mutex<Vec<Result<RemoteJobStatus>>>,
    }

    impl ScriptedService {
        fn new(responses: Vec<Result<RemoteJobStatus>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl RemoteIngestService for ScriptedService {
        async fn create_index(
            &self,
            _stem_name: &str,
            _fields: &BTreeMap<String, FieldType>,
            _embedding_dimensions: usize,
        ) -> Result<String> {
            unimplemented!("not exercised")
        }

        async fn list_files(&self, _container: &str) -> Result<Vec<String>> {
            unimplemented!("not exercised")
        }

        async fn submit_batch_job(&self, _request: &BatchJobRequest) -> Result<JobHandle> {
            unimplemented!("not exercised")
        }

        async fn get_job_status(&self, _handle: &JobHandle) -> Result<RemoteJobStatus> {
            self.responses.lock().await.remove(0)
        }

        async fn sync_index(
            &self,
            _index_name: &str,
            _extract_container: &str,
        ) -> Result<JobHandle> {
            unimplemented!("not exercised")
        }
    }

    fn handle() -> JobHandle {
        JobHandle::new("https://svc/runtime/instances/abc")
    }

    #[tokio::test]
    async fn test_probe_normalizes_running() {
        let service = Arc::new(ScriptedService::new(vec![Ok(RemoteJobStatus {
            runtime_status: "Running".to_string(),
            output: None,
        })]));
        let prober = StatusProber::new(service);

        let snapshot = prober.probe(&handle()).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Running);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_probe_extracts_failure_detail() {
        let service = Arc::new(ScriptedService::new(vec![Ok(RemoteJobStatus {
            runtime_status: "Failed".to_string(),
            output: Some(serde_json::json!({"error": "page 3 unreadable"})),
        })]));
        let prober = StatusProber::new(service);

        let snapshot = prober.probe(&handle()).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("page 3 unreadable"));
    }

    #[tokio::test]
    async fn test_probe_failed_without_output_gives_empty_detail() {
        let service = Arc::new(ScriptedService::new(vec![Ok(RemoteJobStatus {
            runtime_status: "Failed".to_string(),
            output: None,
        })]));
        let prober = StatusProber::new(service);

        let snapshot = prober.probe(&handle()).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_probe_unknown_status_is_non_terminal() {
        let service = Arc::new(ScriptedService::new(vec![Ok(RemoteJobStatus {
            runtime_status: "Terminated".to_string(),
            output: None,
        })]));
        let prober = StatusProber::new(service);

        let snapshot = prober.probe(&handle()).await.unwrap();
        assert!(!snapshot.status.is_terminal());
    }

    #[tokio::test]
    async fn test_probe_propagates_transport_error() {
        let service = Arc::new(ScriptedService::new(vec![Err(Error::probe(
            "connection reset",
        ))]));
        let prober = StatusProber::new(service);

        let result = prober.probe(&handle()).await;
        assert!(matches!(result, Err(Error::Probe(_))));
    }

    #[test]
    fn test_extract_error_detail_from_plain_string() {
        let output = serde_json::Value::String("boom".to_string());
        assert_eq!(extract_error_detail(Some(&output)), "boom");
    }

    #[test]
    fn test_extract_error_detail_falls_back_to_raw_output() {
        let output = serde_json::json!({"detail": "no error key"});
        assert_eq!(
            extract_error_detail(Some(&output)),
            output.to_string()
        );
    }
}
