//! Storage backend trait definition
//!
//! This module defines the `StorageBackend` trait that every store
//! implements: the device store, the append-only result log and the
//! template library live behind one trait so that a probe outcome can be
//! committed to the device and the log in a single atomic step.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::device::{Device, LogEntry, Template};

use super::error::StorageResult;

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for device/log storage backends
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the scheduler commits outcomes
/// from many probe tasks at once.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>`. Implementations convert their
/// native errors to `StorageError` variants.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    // ========================================================================
    // Device store
    // ========================================================================

    /// All devices, newest first
    async fn list_devices(&self) -> StorageResult<Vec<Device>>;

    /// Enabled devices only, newest first
    async fn list_enabled(&self) -> StorageResult<Vec<Device>>;

    async fn get_device(&self, id: &str) -> StorageResult<Option<Device>>;

    /// Insert or replace a device
    ///
    /// An empty id is replaced by a fresh UUID. When the device already
    /// exists its original `created_at` is kept.
    async fn upsert_device(&self, device: Device) -> StorageResult<Device>;

    /// Delete a device together with its log entries
    ///
    /// Returns `false` if no such device existed.
    async fn delete_device(&self, id: &str) -> StorageResult<bool>;

    /// Record a probe outcome
    ///
    /// Updates the device's `last_checked_at`, `last_message` and
    /// `last_color` from `entry` and appends `entry` to the result log.
    /// Both writes commit together or not at all; an unknown device yields
    /// `StorageError::NotFound` and writes nothing.
    async fn commit_outcome(&self, entry: &LogEntry) -> StorageResult<()>;

    // ========================================================================
    // Result log
    // ========================================================================

    /// The `limit` most recent log entries for a device, oldest first
    async fn query_logs(&self, device_id: &str, limit: usize) -> StorageResult<Vec<LogEntry>>;

    /// Delete log entries older than `before`
    ///
    /// Used for retention policy enforcement. Returns the number of
    /// entries deleted.
    async fn cleanup_old_logs(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    // ========================================================================
    // Template library
    // ========================================================================

    /// All templates, newest first
    async fn list_templates(&self) -> StorageResult<Vec<Template>>;

    /// Store a new template; an empty id is replaced by a fresh UUID
    async fn create_template(&self, template: Template) -> StorageResult<Template>;

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}

/// Fresh identifier for devices and templates created without one
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
