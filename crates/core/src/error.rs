/// Domain-level error taxonomy shared by the submitter, worker and API.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The queue could not be reached while submitting a task.
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    /// The result store could not be reached for a read or write.
    #[error("Result store unavailable: {0}")]
    ResultStoreUnavailable(String),

    /// The business function for a task failed.
    #[error("Task execution failed: {0}")]
    Execution(String),

    /// A queued or stored value could not be decoded.
    #[error("Malformed record: {0}")]
    Malformed(String),
}
