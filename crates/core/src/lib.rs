//! Domain building blocks shared by the submitter, worker, API and client:
//! task kinds and their pure transformations, queued/stored record shapes,
//! cross-process correlation, the tracer capability, and the poll policy.

pub mod config;
pub mod correlation;
pub mod error;
pub mod poll;
pub mod result;
pub mod task;
pub mod trace;
pub mod types;
