//! API shared state

use std::sync::Arc;

use crate::probes::ProbeExecutor;
use crate::storage::StorageBackend;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Device store, result log and template library
    pub store: Arc<dyn StorageBackend>,

    /// Executor used by the manual "run now" trigger
    pub executor: Arc<ProbeExecutor>,
}

impl ApiState {
    pub fn new(store: Arc<dyn StorageBackend>, executor: Arc<ProbeExecutor>) -> Self {
        Self { store, executor }
    }
}
