//! Batch driver: submission, tracking, and convergence for one whole batch

use std::sync::Arc;
use tokio::sync::watch;

use crate::config::DriverConfig;
use crate::error::Error;
use crate::remote::RemoteIngestService;
use crate::submission::SubmissionClient;
use crate::tracker::{
    BatchTracker, ConvergenceLoop, Outcome, Partition, StatusProber,
};

/// Result of driving one batch
pub struct BatchRun {
    /// Tracker with the full per-item record; kept for reporting and for
    /// explicit resubmission of failed items
    pub tracker: BatchTracker,
    /// How the convergence loop ended
    pub outcome: Outcome,
    /// Items that never made it into the tracker, with the submission error.
    /// A submission failure aborts only that item's enrollment, not the batch.
    pub submission_failures: Vec<(String, Error)>,
}

impl BatchRun {
    /// Partition of the sealed entries into succeeded and failed items
    pub fn partition(&self) -> Partition {
        self.tracker.partition()
    }
}

/// Orchestrates a full batch: submit every work item, track the jobs, and
/// poll to convergence
pub struct BatchDriver {
    service: Arc<dyn RemoteIngestService>,
    config: DriverConfig,
}

impl BatchDriver {
    pub fn new(service: Arc<dyn RemoteIngestService>, config: DriverConfig) -> Self {
        Self { service, config }
    }

    /// Submit every work item against `index_name` and register the resulting
    /// handles. Items whose submission fails are reported back without
    /// disturbing the rest of the batch.
    pub async fn enroll(
        &self,
        index_name: &str,
        work_items: &[String],
    ) -> (BatchTracker, Vec<(String, Error)>) {
        let submitter = SubmissionClient::new(self.service.clone(), &self.config, index_name);
        let prober = Arc::new(StatusProber::new(self.service.clone()));
        let mut tracker = BatchTracker::new(prober);
        let mut failures = Vec::new();

        for work_item in work_items {
            match submitter.submit(work_item).await {
                Ok(handle) => {
                    if let Err(e) = tracker.register(work_item.clone(), handle).await {
                        failures.push((work_item.clone(), e));
                    }
                }
                Err(e) => {
                    tracing::error!("Submission of '{}' failed: {}", work_item, e);
                    failures.push((work_item.clone(), e));
                }
            }
        }

        (tracker, failures)
    }

    /// Enroll the batch and drive it until it converges or `shutdown` signals
    pub async fn run(
        &self,
        index_name: &str,
        work_items: &[String],
        shutdown: watch::Receiver<bool>,
    ) -> BatchRun {
        let (mut tracker, submission_failures) = self.enroll(index_name, work_items).await;
        tracing::info!(
            "Enrolled {}/{} work items",
            tracker.len(),
            work_items.len()
        );

        let outcome = ConvergenceLoop::from_config(&self.config.polling)
            .run(&mut tracker, shutdown)
            .await;

        BatchRun {
            tracker,
            outcome,
            submission_failures,
        }
    }
}
