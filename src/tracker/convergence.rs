//! Convergence loop: probe all live entries each round until the batch seals

use std::time::Duration;
use tokio::sync::watch;

use super::batch::BatchTracker;
use crate::config::PollConfig;

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every entry reached a terminal outcome
    Converged { rounds: u32 },
    /// Cancelled between rounds; tracker state remains valid
    Interrupted { rounds: u32 },
}

impl Outcome {
    pub fn rounds(&self) -> u32 {
        match self {
            Outcome::Converged { rounds } | Outcome::Interrupted { rounds } => *rounds,
        }
    }
}

/// Fixed-interval polling policy driving a [`BatchTracker`] to convergence
///
/// There is no upper bound on rounds: remote processing duration is unbounded
/// and workload-dependent, so the loop favors eventual completion over
/// timeout-based abandonment. Callers that need a deadline cancel through the
/// shutdown channel.
pub struct ConvergenceLoop {
    interval: Duration,
}

impl ConvergenceLoop {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &PollConfig) -> Self {
        Self::new(Duration::from_secs(config.interval_secs))
    }

    /// Drive the tracker until it converges or the shutdown channel signals
    /// `true`. Cancellation is honored between rounds only; a round in flight
    /// finishes its per-entry updates first.
    pub async fn run(
        &self,
        tracker: &mut BatchTracker,
        mut shutdown: watch::Receiver<bool>,
    ) -> Outcome {
        let mut rounds = 0u32;

        loop {
            if *shutdown.borrow() {
                tracing::info!("Convergence loop interrupted after {} rounds", rounds);
                return Outcome::Interrupted { rounds };
            }

            tracker.refresh_all().await;
            rounds += 1;

            let stats = tracker.stats();
            tracing::info!(
                "Round {}: {} live, {} completed, {} failed",
                rounds,
                stats.live,
                stats.completed,
                stats.failed
            );

            if tracker.is_converged() {
                tracing::info!("Batch converged after {} rounds", rounds);
                return Outcome::Converged { rounds };
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = wait_for_cancel(&mut shutdown) => {
                    tracing::info!("Convergence loop interrupted after {} rounds", rounds);
                    return Outcome::Interrupted { rounds };
                }
            }
        }
    }

    /// Drive the tracker to convergence without external cancellation;
    /// returns the number of rounds taken.
    pub async fn run_to_convergence(&self, tracker: &mut BatchTracker) -> u32 {
        let (_tx, rx) = watch::channel(false);
        self.run(tracker, rx).await.rounds()
    }
}

/// Resolve when the channel carries `true`. If the sender is dropped the
/// future never resolves, so a closed channel cannot busy-spin the loop.
async fn wait_for_cancel(shutdown: &mut watch::Receiver<bool>) {
    if *shutdown.borrow() {
        return;
    }
    while shutdown.changed().await.is_ok() {
        if *shutdown.borrow() {
            return;
        }
    }
    std::future::pending::<()>().await
}
