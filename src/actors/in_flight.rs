//! Per-device in-flight tracking
//!
//! A device id is held in the registry for as long as its [`InFlightGuard`]
//! lives. The guard releases the id on drop, which covers normal
//! completion, probe errors, timeouts and panics inside the probe task.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of device ids with a probe currently running
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as in flight, or `None` if it already is
    pub fn try_acquire(&self, id: &str) -> Option<InFlightGuard> {
        if !self.lock().insert(id.to_string()) {
            return None;
        }

        Some(InFlightGuard {
            registry: self.clone(),
            id: id.to_string(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The set stays consistent even if a holder panicked mid-update
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases its device id when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightRegistry,
    id: String,
}

impl InFlightGuard {
    pub fn device_id(&self) -> &str {
        &self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
