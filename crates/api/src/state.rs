use std::sync::Arc;

use taskrelay_store::{ResultReader, ResultStore, TaskQueue, TaskSubmitter};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Enqueues submitted tasks.
    pub submitter: TaskSubmitter,
    /// Reads task results.
    pub results: ResultReader,
    /// Direct queue handle, used for depth reporting.
    pub queue: Arc<dyn TaskQueue>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build state over a store that serves as both queue and result store.
    pub fn new<S>(store: Arc<S>, config: ServerConfig) -> Self
    where
        S: TaskQueue + ResultStore + 'static,
    {
        let queue: Arc<dyn TaskQueue> = store.clone();
        Self {
            submitter: TaskSubmitter::new(queue.clone()),
            results: ResultReader::new(store),
            queue,
            config: Arc::new(config),
        }
    }
}
