//! docbatch: batch ingestion driver for a remote document processing service
//!
//! Submits a batch of documents as independent long-running remote jobs,
//! tracks each job to a terminal status through a fixed-interval polling
//! loop, and partitions the batch into succeeded and failed items. Failed
//! items can be resubmitted without disturbing completed ones.

pub mod config;
pub mod driver;
pub mod error;
pub mod indexing;
pub mod remote;
pub mod submission;
pub mod tracker;

pub use config::DriverConfig;
pub use driver::{BatchDriver, BatchRun};
pub use error::{Error, Result};
pub use remote::{HttpIngestService, IndexedChunk, JobHandle, RemoteIngestService};
pub use submission::SubmissionClient;
pub use tracker::{
    BatchTracker, ConvergenceLoop, JobStatus, Outcome, Partition, StatusProber, TrackerEntry,
};
