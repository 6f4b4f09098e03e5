//! Batch job tracking: status normalization, probing, the per-batch state
//! machine, and the convergence loop that drives it

pub mod batch;
pub mod convergence;
pub mod probe;
pub mod status;

pub use batch::{BatchStats, BatchTracker, Partition, TrackerEntry};
pub use convergence::{ConvergenceLoop, Outcome};
pub use probe::{StatusProbe, StatusProber, StatusSnapshot};
pub use status::JobStatus;
