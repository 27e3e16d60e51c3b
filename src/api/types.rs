//! Shared API request and response types
//!
//! Devices, templates, log entries and probe outcomes are served in their
//! model shape from [`crate::device`]; this module only holds the small
//! envelopes around them.

use serde::{Deserialize, Serialize};

/// Default number of log entries returned by the logs endpoint
pub const DEFAULT_LOG_LIMIT: usize = 200;

/// Upper bound for the logs endpoint `limit` parameter
pub const MAX_LOG_LIMIT: usize = 1000;

/// `{ "ok": true }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Reply to a create or upsert: `{ "ok": true, "id": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub ok: bool,
    pub id: String,
}

impl CreatedResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: id.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,

    /// Storage backend status message
    pub storage: String,
}

/// Query parameters for the logs endpoint
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

impl LogsQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
    }
}
