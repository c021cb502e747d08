//! Task worker: pulls tasks off the queue, runs them, and records results.

pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod startup;
pub mod worker_loop;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use executor::{StandardExecutor, TaskExecutor};
pub use metrics::{LogMetrics, WorkerMetrics};
pub use worker_loop::{WorkerLoop, WorkerSettings, WorkerState, WorkerSummary};
