//! Normalized job status vocabulary

use serde::{Deserialize, Serialize};

/// Normalized lifecycle status of one remote job
///
/// The remote service reports a wider, string-typed vocabulary; the tracker
/// works exclusively with these four states. `Completed` and `Failed` are
/// terminal; `Pending` and `Running` keep being probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// True for statuses after which no further change is expected without
    /// explicit resubmission
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Map a remote runtime-status label to the normalized vocabulary.
    ///
    /// Returns `None` for labels outside the known set; callers keep polling
    /// in that case rather than classifying the job.
    pub fn from_remote(label: &str) -> Option<JobStatus> {
        match label.to_ascii_lowercase().as_str() {
            "pending" | "notstarted" | "queued" => Some(JobStatus::Pending),
            "running" | "inprogress" => Some(JobStatus::Running),
            "completed" | "succeeded" => Some(JobStatus::Completed),
            "failed" | "error" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}
