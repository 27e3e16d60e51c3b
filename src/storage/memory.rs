//! In-memory storage backend (no persistence)
//!
//! It's useful for:
//! - Testing without database dependencies
//! - Running without a configured database
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart
//! - **Unbounded logs**: Entries are only removed by device deletion or
//!   retention cleanup, so memory grows with probe history

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::device::{Device, LogEntry, Template};

use super::backend::{HealthStatus, StorageBackend, new_id};
use super::error::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct State {
    devices: HashMap<String, Device>,
    logs: HashMap<String, Vec<LogEntry>>,
    templates: Vec<Template>,
    next_log_id: u64,
}

/// In-memory storage backend
///
/// Devices, logs and templates share one lock, so a committed outcome is
/// visible either completely or not at all.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut devices: Vec<Device>) -> Vec<Device> {
    devices.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    devices
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn list_devices(&self) -> StorageResult<Vec<Device>> {
        let state = self.state.read().await;
        Ok(newest_first(state.devices.values().cloned().collect()))
    }

    async fn list_enabled(&self) -> StorageResult<Vec<Device>> {
        let state = self.state.read().await;
        Ok(newest_first(
            state.devices.values().filter(|d| d.enabled).cloned().collect(),
        ))
    }

    async fn get_device(&self, id: &str) -> StorageResult<Option<Device>> {
        Ok(self.state.read().await.devices.get(id).cloned())
    }

    async fn upsert_device(&self, mut device: Device) -> StorageResult<Device> {
        if device.id.is_empty() {
            device.id = new_id();
        }

        let mut state = self.state.write().await;
        if let Some(existing) = state.devices.get(&device.id) {
            device.created_at = existing.created_at;
        }
        debug!("in-memory backend: upserting device {}", device.id);
        state.devices.insert(device.id.clone(), device.clone());

        Ok(device)
    }

    async fn delete_device(&self, id: &str) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        state.logs.remove(id);
        Ok(state.devices.remove(id).is_some())
    }

    async fn commit_outcome(&self, entry: &LogEntry) -> StorageResult<()> {
        let mut state = self.state.write().await;

        let device = state
            .devices
            .get_mut(&entry.device_id)
            .ok_or_else(|| StorageError::NotFound(entry.device_id.clone()))?;
        device.last_checked_at = Some(entry.timestamp);
        device.last_message = Some(entry.message.clone());
        device.last_color = Some(entry.color.clone());

        state.next_log_id += 1;
        let log_id = state.next_log_id;
        state.logs.entry(entry.device_id.clone()).or_default().push(LogEntry {
            id: Some(log_id.to_string()),
            ..entry.clone()
        });

        Ok(())
    }

    async fn query_logs(&self, device_id: &str, limit: usize) -> StorageResult<Vec<LogEntry>> {
        let state = self.state.read().await;
        let logs = state
            .logs
            .get(device_id)
            .map(|entries| entries[entries.len().saturating_sub(limit)..].to_vec())
            .unwrap_or_default();

        Ok(logs)
    }

    async fn cleanup_old_logs(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut state = self.state.write().await;
        let mut deleted = 0;
        for logs in state.logs.values_mut() {
            let len = logs.len();
            logs.retain(|entry| entry.timestamp >= before);
            deleted += len - logs.len();
        }

        debug!("in-memory backend: deleted {} old log entries", deleted);
        Ok(deleted)
    }

    async fn list_templates(&self) -> StorageResult<Vec<Template>> {
        let mut templates = self.state.read().await.templates.clone();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn create_template(&self, mut template: Template) -> StorageResult<Template> {
        if template.id.is_empty() {
            template.id = new_id();
        }
        self.state.write().await.templates.push(template.clone());
        Ok(template)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let state = self.state.read().await;
        let total_logs: usize = state.logs.values().map(Vec::len).sum();

        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("devices".to_string(), state.devices.len().to_string()),
                ("log_entries".to_string(), total_logs.to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
