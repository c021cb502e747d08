use taskrelay_core::types::TaskId;

/// Conditions that stop a worker loop or prevent it from starting.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// A result could not be recorded. The task's outcome is lost and the
    /// process should exit so a supervisor can restart it.
    #[error("Result store unavailable while recording task {task_id}: {message}")]
    ResultStoreUnavailable { task_id: TaskId, message: String },

    /// The store never became reachable during startup.
    #[error("Store not reachable after {attempts} attempts: {message}")]
    StoreConnect { attempts: u32, message: String },
}
