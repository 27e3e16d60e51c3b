//! Row layouts shared by the SQL backends
//!
//! Devices and templates are stored as flat columns mirroring
//! [`ProbeFields`]; headers, body and matchers are JSON text. Timestamps
//! are Unix milliseconds.
//!
//! ```sql
//! CREATE TABLE devices (
//!     id TEXT PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     ...check columns...,
//!     last_checked_at INTEGER,
//!     last_message TEXT,
//!     last_color TEXT,
//!     created_at INTEGER NOT NULL
//! );
//! CREATE TABLE probe_logs (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     device_id TEXT NOT NULL,
//!     timestamp INTEGER NOT NULL,
//!     ok INTEGER NOT NULL,
//!     message TEXT NOT NULL,
//!     color TEXT NOT NULL
//! );
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::device::{
    CheckDefinition, Device, MatcherRule, ProbeFields, ProbeSpec, Schedule, Template, TimeUnit,
};

use super::error::StorageResult;

/// Columns describing a check, shared by `devices` and `templates`
#[derive(Debug, Clone, PartialEq)]
pub struct CheckColumns {
    pub request_type: String,
    pub method: Option<String>,
    pub url_or_host: String,
    pub port: Option<i64>,
    pub headers_json: Option<String>,
    pub body_json: Option<String>,
    pub payload: Option<String>,
    pub every: i64,
    pub unit: String,
    pub matchers_json: String,
}

impl CheckColumns {
    pub fn from_check(check: &CheckDefinition) -> StorageResult<Self> {
        let fields = ProbeFields::from(check.probe.clone());

        let headers_json = fields
            .headers
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let body_json = fields.body.as_ref().map(serde_json::to_string).transpose()?;

        Ok(Self {
            request_type: fields.request_type,
            method: fields.method,
            url_or_host: fields.url_or_host,
            port: fields.port.map(i64::from),
            headers_json,
            body_json,
            payload: fields.payload,
            every: check.schedule.every,
            unit: check.schedule.unit.as_str().to_string(),
            matchers_json: serde_json::to_string(&check.matchers)?,
        })
    }

    /// Rebuild the check definition
    ///
    /// Malformed JSON columns degrade to "absent" (and an empty rule list)
    /// rather than failing the whole listing.
    pub fn into_check(self) -> CheckDefinition {
        let headers = self.headers_json.as_deref().and_then(|raw| {
            serde_json::from_str::<BTreeMap<String, String>>(raw)
                .inspect_err(|e| warn!("ignoring malformed headers column: {}", e))
                .ok()
        });
        // Bodies written by older clients may be plain text rather than JSON
        let body = self.body_json.map(|raw| {
            serde_json::from_str::<serde_json::Value>(&raw)
                .unwrap_or(serde_json::Value::String(raw))
        });
        let matchers = serde_json::from_str::<Vec<MatcherRule>>(&self.matchers_json)
            .inspect_err(|e| warn!("ignoring malformed matchers column: {}", e))
            .unwrap_or_default();

        let probe = ProbeSpec::from(ProbeFields {
            request_type: self.request_type,
            method: self.method,
            url_or_host: self.url_or_host,
            port: self.port.and_then(|p| u16::try_from(p).ok()),
            headers,
            body,
            payload: self.payload,
        });

        CheckDefinition {
            probe,
            schedule: Schedule::new(self.every, TimeUnit::parse_lenient(&self.unit)),
            matchers,
        }
    }
}

/// One row of the `devices` table
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub enabled: bool,
    pub template_id: Option<String>,
    pub check: CheckColumns,
    pub last_checked_at: Option<i64>,
    pub last_message: Option<String>,
    pub last_color: Option<String>,
    pub created_at: i64,
}

impl DeviceRow {
    pub fn from_device(device: &Device) -> StorageResult<Self> {
        Ok(Self {
            id: device.id.clone(),
            name: device.name.clone(),
            description: device.description.clone(),
            image_url: device.image_url.clone(),
            enabled: device.enabled,
            template_id: device.template_id.clone(),
            check: CheckColumns::from_check(&device.check)?,
            last_checked_at: device.last_checked_at.as_ref().map(timestamp_to_millis),
            last_message: device.last_message.clone(),
            last_color: device.last_color.clone(),
            created_at: timestamp_to_millis(&device.created_at),
        })
    }

    pub fn into_device(self) -> Device {
        Device {
            id: self.id,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            enabled: self.enabled,
            template_id: self.template_id,
            check: self.check.into_check(),
            last_checked_at: self.last_checked_at.map(millis_to_timestamp),
            last_message: self.last_message,
            last_color: self.last_color,
            created_at: millis_to_timestamp(self.created_at),
        }
    }
}

/// One row of the `templates` table
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub check: CheckColumns,
    pub created_at: i64,
}

impl TemplateRow {
    pub fn from_template(template: &Template) -> StorageResult<Self> {
        Ok(Self {
            id: template.id.clone(),
            name: template.name.clone(),
            description: template.description.clone(),
            check: CheckColumns::from_check(&template.check)?,
            created_at: timestamp_to_millis(&template.created_at),
        })
    }

    pub fn into_template(self) -> Template {
        Template {
            id: self.id,
            name: self.name,
            description: self.description,
            check: self.check.into_check(),
            created_at: millis_to_timestamp(self.created_at),
        }
    }
}

/// Convert a timestamp to Unix milliseconds for storage
pub fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// Convert stored Unix milliseconds back to a timestamp
pub fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
