//! Batch tracker: the work-item → job-handle → status state machine
//!
//! One `TrackerEntry` per submitted work item, keyed by the item's name.
//! Entries are mutated only by status refreshes and explicit resubmission,
//! and are never deleted; a finished batch keeps its entries for reporting.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::probe::StatusProbe;
use super::status::JobStatus;
use crate::error::{Error, Result};
use crate::remote::JobHandle;

/// Aggregate record for one work item
#[derive(Debug, Clone)]
pub struct TrackerEntry {
    /// Work item identifier (the map key, duplicated here for reporting)
    pub work_item: String,
    /// Current job handle; replaced on resubmission, never reused across items
    pub handle: JobHandle,
    /// Last known normalized status
    pub status: JobStatus,
    /// Error payload captured from a failed job
    pub error: Option<String>,
    /// The item has been handed to the remote service
    pub submitted: bool,
    /// Outcome is final; the entry is never probed again unless resubmitted.
    /// Set for both `Completed` and `Failed` outcomes.
    pub completed: bool,
    /// When the current handle was obtained
    pub submitted_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl TrackerEntry {
    fn new(work_item: String, handle: JobHandle) -> Self {
        let now = Utc::now();
        Self {
            work_item,
            handle,
            status: JobStatus::Pending,
            error: None,
            submitted: true,
            completed: false,
            submitted_at: now,
            updated_at: now,
        }
    }

    /// Apply one probe result. Terminal statuses seal the entry.
    fn apply(&mut self, status: JobStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.updated_at = Utc::now();
        if status.is_terminal() {
            self.completed = true;
        }
    }
}

/// Final split of a batch into succeeded and failed work items
///
/// Only sealed entries are partitioned; once the batch is converged every
/// work item appears in exactly one of the two sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub succeeded: BTreeSet<String>,
    pub failed: BTreeSet<String>,
}

/// Counts by state, in the shape the convergence loop logs each round
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    /// Entries still being probed
    pub live: usize,
}

/// Tracks a batch of submitted work items through remote completion
pub struct BatchTracker {
    entries: BTreeMap<String, TrackerEntry>,
    prober: Arc<dyn StatusProbe>,
}

impl BatchTracker {
    pub fn new(prober: Arc<dyn StatusProbe>) -> Self {
        Self {
            entries: BTreeMap::new(),
            prober,
        }
    }

    /// Record a freshly submitted work item and probe it once immediately,
    /// so the caller has a status before the first convergence round.
    ///
    /// A transient probe failure leaves the entry `Pending`; it is retried
    /// on the next round.
    pub async fn register(&mut self, work_item: impl Into<String>, handle: JobHandle) -> Result<()> {
        let work_item = work_item.into();
        if self.entries.contains_key(&work_item) {
            return Err(Error::AlreadyTracked(work_item));
        }

        let mut entry = TrackerEntry::new(work_item.clone(), handle);
        match self.prober.probe(&entry.handle).await {
            Ok(snapshot) => entry.apply(snapshot.status, snapshot.error),
            Err(e) => {
                tracing::warn!("Initial probe for '{}' failed, will retry: {}", work_item, e);
            }
        }

        tracing::info!("Tracking '{}' ({})", work_item, entry.status);
        self.entries.insert(work_item, entry);
        Ok(())
    }

    /// Probe every live entry exactly once and fold the results in.
    ///
    /// Sealed entries are never touched. Transient probe failures keep the
    /// prior status; the entry stays live and is probed again next round.
    /// Probes for a round fan out concurrently; each entry gets exactly one
    /// write afterwards.
    pub async fn refresh_all(&mut self) {
        let live: Vec<(String, JobHandle)> = self
            .entries
            .values()
            .filter(|e| !e.completed)
            .map(|e| (e.work_item.clone(), e.handle.clone()))
            .collect();

        if live.is_empty() {
            return;
        }

        let prober = self.prober.clone();
        let probes = live.iter().map(|(_, handle)| {
            let prober = prober.clone();
            let handle = handle.clone();
            async move { prober.probe(&handle).await }
        });
        let results = join_all(probes).await;

        for ((work_item, _), result) in live.into_iter().zip(results) {
            let Some(entry) = self.entries.get_mut(&work_item) else {
                continue;
            };
            match result {
                Ok(snapshot) => {
                    entry.apply(snapshot.status, snapshot.error);
                    if entry.completed {
                        match entry.status {
                            JobStatus::Failed => tracing::warn!(
                                "'{}' failed: {}",
                                work_item,
                                entry.error.as_deref().unwrap_or("")
                            ),
                            _ => tracing::info!("'{}' completed", work_item),
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Probe for '{}' failed, keeping status {}: {}",
                        work_item,
                        entry.status,
                        e
                    );
                }
            }
        }
    }

    /// True iff every entry's outcome is final
    pub fn is_converged(&self) -> bool {
        self.entries.values().all(|e| e.completed)
    }

    /// Split sealed entries into succeeded and failed work items.
    /// Succeeded means `status == Completed`; every other sealed entry
    /// counts as failed.
    pub fn partition(&self) -> Partition {
        let mut partition = Partition::default();
        for entry in self.entries.values().filter(|e| e.completed) {
            if entry.status == JobStatus::Completed {
                partition.succeeded.insert(entry.work_item.clone());
            } else {
                partition.failed.insert(entry.work_item.clone());
            }
        }
        partition
    }

    /// Put a failed work item back in flight under a fresh handle.
    ///
    /// Only entries that are sealed with `status == Failed` are eligible;
    /// completed entries and unknown items are rejected. The error payload is
    /// cleared and the new handle is probed once, as at registration.
    pub async fn resubmit(&mut self, work_item: &str, new_handle: JobHandle) -> Result<()> {
        let entry = self
            .entries
            .get_mut(work_item)
            .ok_or_else(|| Error::UnknownWorkItem(work_item.to_string()))?;

        if !entry.completed || entry.status != JobStatus::Failed {
            return Err(Error::InvalidResubmit {
                work_item: work_item.to_string(),
                state: entry.status.to_string(),
            });
        }

        let now = Utc::now();
        entry.handle = new_handle;
        entry.status = JobStatus::Pending;
        entry.error = None;
        entry.submitted = true;
        entry.completed = false;
        entry.submitted_at = now;
        entry.updated_at = now;

        let handle = entry.handle.clone();
        match self.prober.probe(&handle).await {
            Ok(snapshot) => {
                if let Some(entry) = self.entries.get_mut(work_item) {
                    entry.apply(snapshot.status, snapshot.error);
                }
            }
            Err(e) => {
                tracing::warn!("Initial probe for resubmitted '{}' failed: {}", work_item, e);
            }
        }

        tracing::info!("Resubmitted '{}'", work_item);
        Ok(())
    }

    /// Look up one entry
    pub fn entry(&self, work_item: &str) -> Option<&TrackerEntry> {
        self.entries.get(work_item)
    }

    /// All entries in work-item order
    pub fn entries(&self) -> impl Iterator<Item = &TrackerEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts by state
    pub fn stats(&self) -> BatchStats {
        let mut stats = BatchStats {
            total: self.entries.len(),
            pending: 0,
            running: 0,
            completed: 0,
            failed: 0,
            live: 0,
        };
        for entry in self.entries.values() {
            match entry.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
            if !entry.completed {
                stats.live += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::probe::StatusSnapshot;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Probe double that replays a scripted snapshot sequence per handle and
    /// panics when a handle is probed more often than scripted.
    struct ScriptedProbe {
        scripts: Mutex<HashMap<String, VecDeque<Result<StatusSnapshot>>>>,
    }

    impl ScriptedProbe {
        fn new() -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
            }
        }

        async fn script(
            &self,
            handle: &str,
            responses: Vec<Result<StatusSnapshot>>,
        ) {
            self.scripts
                .lock()
                .await
                .insert(handle.to_string(), responses.into());
        }
    }

    #[async_trait]
    impl StatusProbe for ScriptedProbe {
        async fn probe(&self, handle: &JobHandle) -> Result<StatusSnapshot> {
            let mut scripts = self.scripts.lock().await;
            let queue = scripts
                .get_mut(handle.as_str())
                .unwrap_or_else(|| panic!("unexpected probe for {}", handle));
            queue
                .pop_front()
                .unwrap_or_else(|| panic!("probed {} after script exhausted", handle))
        }
    }

    fn ok(status: JobStatus) -> Result<StatusSnapshot> {
        Ok(StatusSnapshot {
            status,
            error: None,
        })
    }

    fn failed(detail: &str) -> Result<StatusSnapshot> {
        Ok(StatusSnapshot {
            status: JobStatus::Failed,
            error: Some(detail.to_string()),
        })
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    async fn three_item_tracker() -> (BatchTracker, Arc<ScriptedProbe>) {
        let probe = Arc::new(ScriptedProbe::new());
        // A completes at the registration probe; B runs for two rounds after
        // registration and completes on the third; C fails on round 1.
        probe
            .script("handle-a", vec![ok(JobStatus::Completed)])
            .await;
        probe
            .script(
                "handle-b",
                vec![
                    ok(JobStatus::Running),
                    ok(JobStatus::Running),
                    ok(JobStatus::Running),
                    ok(JobStatus::Completed),
                ],
            )
            .await;
        probe
            .script(
                "handle-c",
                vec![ok(JobStatus::Pending), failed("ocr timeout")],
            )
            .await;

        let mut tracker = BatchTracker::new(probe.clone());
        tracker
            .register("a.pdf", JobHandle::new("handle-a"))
            .await
            .unwrap();
        tracker
            .register("b.pdf", JobHandle::new("handle-b"))
            .await
            .unwrap();
        tracker
            .register("c.pdf", JobHandle::new("handle-c"))
            .await
            .unwrap();

        (tracker, probe)
    }

    #[tokio::test]
    async fn test_register_probes_synchronously() {
        let (tracker, _) = three_item_tracker().await;

        // A is already terminal from the registration probe
        let a = tracker.entry("a.pdf").unwrap();
        assert_eq!(a.status, JobStatus::Completed);
        assert!(a.completed);

        let b = tracker.entry("b.pdf").unwrap();
        assert_eq!(b.status, JobStatus::Running);
        assert!(!b.completed);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate() {
        let probe = Arc::new(ScriptedProbe::new());
        probe.script("h1", vec![ok(JobStatus::Pending)]).await;
        let mut tracker = BatchTracker::new(probe);
        tracker.register("a.pdf", JobHandle::new("h1")).await.unwrap();

        let err = tracker
            .register("a.pdf", JobHandle::new("h2"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyTracked(_)));
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test]
    async fn test_scenario_round_by_round() {
        let (mut tracker, _) = three_item_tracker().await;
        assert!(!tracker.is_converged());

        // Round 1: B still running, C fails
        tracker.refresh_all().await;
        let partition = tracker.partition();
        assert_eq!(names(&partition.succeeded), ["a.pdf"]);
        assert_eq!(names(&partition.failed), ["c.pdf"]);
        assert!(!tracker.is_converged());
        assert_eq!(
            tracker.entry("c.pdf").unwrap().error.as_deref(),
            Some("ocr timeout")
        );

        // Round 2: B still running
        tracker.refresh_all().await;
        assert!(!tracker.is_converged());

        // Round 3: B completes, batch converges. A and C are sealed and must
        // not have been probed again (the scripts would panic).
        tracker.refresh_all().await;
        assert!(tracker.is_converged());
        let partition = tracker.partition();
        assert_eq!(names(&partition.succeeded), ["a.pdf", "b.pdf"]);
        assert_eq!(names(&partition.failed), ["c.pdf"]);
    }

    #[tokio::test]
    async fn test_partition_accounts_for_every_item_once() {
        let (mut tracker, _) = three_item_tracker().await;
        for _ in 0..3 {
            tracker.refresh_all().await;
        }
        assert!(tracker.is_converged());

        let partition = tracker.partition();
        assert_eq!(partition.succeeded.len() + partition.failed.len(), tracker.len());
        assert!(partition.succeeded.is_disjoint(&partition.failed));
    }

    #[tokio::test]
    async fn test_refresh_is_noop_on_empty_live_set() {
        let probe = Arc::new(ScriptedProbe::new());
        probe.script("h1", vec![ok(JobStatus::Completed)]).await;
        let mut tracker = BatchTracker::new(probe);
        tracker.register("a.pdf", JobHandle::new("h1")).await.unwrap();
        assert!(tracker.is_converged());

        // Script is exhausted; a probe here would panic
        tracker.refresh_all().await;
        assert!(tracker.is_converged());
    }

    #[tokio::test]
    async fn test_transient_probe_error_retains_status() {
        let probe = Arc::new(ScriptedProbe::new());
        probe
            .script(
                "h1",
                vec![
                    ok(JobStatus::Running),
                    Err(Error::probe("connection reset")),
                    ok(JobStatus::Completed),
                ],
            )
            .await;
        let mut tracker = BatchTracker::new(probe);
        tracker.register("a.pdf", JobHandle::new("h1")).await.unwrap();

        // The failed round keeps the entry live with its prior status
        tracker.refresh_all().await;
        let entry = tracker.entry("a.pdf").unwrap();
        assert_eq!(entry.status, JobStatus::Running);
        assert!(!entry.completed);

        // Next round retries and succeeds
        tracker.refresh_all().await;
        assert!(tracker.is_converged());
    }

    #[tokio::test]
    async fn test_resubmit_failed_item_to_success() {
        let (mut tracker, probe) = three_item_tracker().await;
        for _ in 0..3 {
            tracker.refresh_all().await;
        }

        probe
            .script("handle-c2", vec![ok(JobStatus::Running), ok(JobStatus::Completed)])
            .await;
        tracker
            .resubmit("c.pdf", JobHandle::new("handle-c2"))
            .await
            .unwrap();

        let c = tracker.entry("c.pdf").unwrap();
        assert!(!c.completed);
        assert!(c.error.is_none());
        assert_eq!(c.handle.as_str(), "handle-c2");
        assert!(!tracker.is_converged());

        tracker.refresh_all().await;
        assert!(tracker.is_converged());
        let partition = tracker.partition();
        assert_eq!(names(&partition.succeeded), ["a.pdf", "b.pdf", "c.pdf"]);
        assert!(partition.failed.is_empty());
    }

    #[tokio::test]
    async fn test_resubmit_rejected_for_completed_entry() {
        let (mut tracker, _) = three_item_tracker().await;
        for _ in 0..3 {
            tracker.refresh_all().await;
        }

        let err = tracker
            .resubmit("a.pdf", JobHandle::new("handle-a2"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResubmit { .. }));
        // Entry untouched
        let a = tracker.entry("a.pdf").unwrap();
        assert_eq!(a.status, JobStatus::Completed);
        assert_eq!(a.handle.as_str(), "handle-a");
    }

    #[tokio::test]
    async fn test_resubmit_rejected_while_in_flight() {
        let (mut tracker, _) = three_item_tracker().await;
        tracker.refresh_all().await;

        // B is still live after round 1
        let err = tracker
            .resubmit("b.pdf", JobHandle::new("handle-b2"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResubmit { .. }));
    }

    #[tokio::test]
    async fn test_resubmit_unknown_item() {
        let (mut tracker, _) = three_item_tracker().await;
        let err = tracker
            .resubmit("nope.pdf", JobHandle::new("h"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownWorkItem(_)));
    }

    #[tokio::test]
    async fn test_stats() {
        let (mut tracker, _) = three_item_tracker().await;
        tracker.refresh_all().await;

        let stats = tracker.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.live, 1);
    }
}
