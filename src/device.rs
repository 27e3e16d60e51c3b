//! Device and probe data model
//!
//! Everything that crosses a boundary (REST API, SQLite rows, config file)
//! is defined here. The probe specification is a tagged union over the
//! supported protocols; on the wire it keeps the flat
//! `{requestType, method, urlOrHost, port, headers, body, payload}` shape
//! used by the dashboard.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status color for a passing probe without a matching rule
pub const COLOR_OK: &str = "#22c55e";

/// Status color for a failing probe without a matching rule
pub const COLOR_FAIL: &str = "#ef4444";

/// Upper bound for outcome messages (the HTTP body sample alone is 512 chars)
pub const MAX_MESSAGE_CHARS: usize = 1024;

pub const DEFAULT_TCP_PORT: u16 = 80;
pub const DEFAULT_UDP_PORT: u16 = 53;

// ============================================================================
// Schedule
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    #[default]
    Minutes,
    Hours,
}

impl TimeUnit {
    pub fn millis(self) -> u64 {
        match self {
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
        }
    }

    /// Parse a stored unit; anything unrecognised falls back to minutes.
    pub fn parse_lenient(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "seconds" => TimeUnit::Seconds,
            "hours" => TimeUnit::Hours,
            _ => TimeUnit::Minutes,
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurring check interval expressed as `every` x `unit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default = "default_every")]
    pub every: i64,
    #[serde(default)]
    pub unit: TimeUnit,
}

fn default_every() -> i64 {
    1
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            every: default_every(),
            unit: TimeUnit::default(),
        }
    }
}

impl Schedule {
    pub fn new(every: i64, unit: TimeUnit) -> Self {
        Self { every, unit }
    }

    /// Interval in milliseconds. Non-positive `every` counts as 1.
    pub fn interval_ms(&self) -> u64 {
        let every = if self.every > 0 { self.every as u64 } else { 1 };
        every.saturating_mul(self.unit.millis())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }

    /// A device is due once the time since its last check reaches the interval.
    ///
    /// A device that was never checked counts as checked at the Unix epoch,
    /// so it is due on the first tick after creation.
    pub fn is_due(&self, last_checked_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let last = last_checked_at.map_or(0, |t| t.timestamp_millis());
        let elapsed = now.timestamp_millis().saturating_sub(last);
        let interval = i64::try_from(self.interval_ms()).unwrap_or(i64::MAX);
        elapsed >= interval
    }
}

// ============================================================================
// Matcher rules
// ============================================================================

/// Case-insensitive substring rule mapping a probe response to a status color
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherRule {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub pattern: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MatcherRule {
    pub fn new(pattern: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            pattern: pattern.into(),
            color: color.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// ============================================================================
// Probe specification
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct HttpProbe {
    /// Upper-cased HTTP method
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl HttpProbe {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Bodies are only sent for methods that carry one.
    pub fn sends_body(&self) -> bool {
        matches!(self.method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpProbe {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpProbe {
    pub host: String,
    pub port: u16,
    pub payload: String,
}

/// Protocol-specific probe, resolved from the flat wire form
///
/// Unknown request types are kept as `Unsupported` so that a single bad
/// device fails its own probe instead of the whole device listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProbeFields", into = "ProbeFields")]
pub enum ProbeSpec {
    Http(HttpProbe),
    Tcp(TcpProbe),
    Udp(UdpProbe),
    Unsupported { request_type: String, target: String },
}

impl ProbeSpec {
    pub fn request_type(&self) -> &str {
        match self {
            ProbeSpec::Http(_) => "HTTP",
            ProbeSpec::Tcp(_) => "TCP",
            ProbeSpec::Udp(_) => "UDP",
            ProbeSpec::Unsupported { request_type, .. } => request_type,
        }
    }

    /// URL for HTTP, host for TCP/UDP
    pub fn target(&self) -> &str {
        match self {
            ProbeSpec::Http(http) => &http.url,
            ProbeSpec::Tcp(tcp) => &tcp.host,
            ProbeSpec::Udp(udp) => &udp.host,
            ProbeSpec::Unsupported { target, .. } => target,
        }
    }
}

/// Flat representation of a probe, as sent by the dashboard and stored in SQLite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeFields {
    pub request_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub url_or_host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl From<ProbeFields> for ProbeSpec {
    fn from(fields: ProbeFields) -> Self {
        let port = fields.port.filter(|p| *p != 0);
        match fields.request_type.to_ascii_uppercase().as_str() {
            "HTTP" => ProbeSpec::Http(HttpProbe {
                method: fields
                    .method
                    .filter(|m| !m.trim().is_empty())
                    .map(|m| m.trim().to_ascii_uppercase())
                    .unwrap_or_else(|| "GET".to_string()),
                url: fields.url_or_host,
                headers: fields.headers.unwrap_or_default(),
                body: fields.body.filter(|b| !b.is_null()),
            }),
            "TCP" => ProbeSpec::Tcp(TcpProbe {
                host: fields.url_or_host,
                port: port.unwrap_or(DEFAULT_TCP_PORT),
            }),
            "UDP" => ProbeSpec::Udp(UdpProbe {
                host: fields.url_or_host,
                port: port.unwrap_or(DEFAULT_UDP_PORT),
                payload: fields.payload.unwrap_or_default(),
            }),
            _ => ProbeSpec::Unsupported {
                request_type: fields.request_type,
                target: fields.url_or_host,
            },
        }
    }
}

impl From<ProbeSpec> for ProbeFields {
    fn from(spec: ProbeSpec) -> Self {
        match spec {
            ProbeSpec::Http(http) => ProbeFields {
                request_type: "HTTP".to_string(),
                method: Some(http.method),
                url_or_host: http.url,
                headers: (!http.headers.is_empty()).then_some(http.headers),
                body: http.body,
                ..Default::default()
            },
            ProbeSpec::Tcp(tcp) => ProbeFields {
                request_type: "TCP".to_string(),
                url_or_host: tcp.host,
                port: Some(tcp.port),
                ..Default::default()
            },
            ProbeSpec::Udp(udp) => ProbeFields {
                request_type: "UDP".to_string(),
                url_or_host: udp.host,
                port: Some(udp.port),
                payload: (!udp.payload.is_empty()).then_some(udp.payload),
                ..Default::default()
            },
            ProbeSpec::Unsupported {
                request_type,
                target,
            } => ProbeFields {
                request_type,
                url_or_host: target,
                ..Default::default()
            },
        }
    }
}

/// What to probe, how often, and how to classify the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDefinition {
    #[serde(flatten)]
    pub probe: ProbeSpec,
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(default)]
    pub matchers: Vec<MatcherRule>,
}

impl CheckDefinition {
    pub fn new(probe: ProbeSpec, schedule: Schedule) -> Self {
        Self {
            probe,
            schedule,
            matchers: Vec::new(),
        }
    }

    pub fn with_matchers(mut self, matchers: Vec<MatcherRule>) -> Self {
        self.matchers = matchers;
        self
    }
}

// ============================================================================
// Devices, templates and log entries
// ============================================================================

/// A monitored endpoint with its check definition and last known status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(rename = "template")]
    pub check: CheckDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_color: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>, check: CheckDefinition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            image_url: None,
            enabled: true,
            template_id: None,
            check,
            last_checked_at: None,
            last_message: None,
            last_color: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.check.schedule.is_due(self.last_checked_at, now)
    }
}

/// Reusable check definition from the template library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub check: CheckDefinition,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Result of one probe execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    pub ok: bool,
    pub color: String,
    pub message: String,
    pub elapsed_ms: u64,
}

impl ProbeOutcome {
    pub fn new(ok: bool, color: impl Into<String>, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            ok,
            color: color.into(),
            message: truncate_chars(message.into(), MAX_MESSAGE_CHARS),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Outcome for a probe that could not complete (transport or configuration error)
    pub fn failure(message: impl Into<String>, elapsed: Duration) -> Self {
        Self::new(false, COLOR_FAIL, message, elapsed)
    }
}

fn truncate_chars(message: String, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message,
    }
}

/// Manual "test now" request: a probe plus its matcher rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRequest {
    #[serde(flatten)]
    pub probe: ProbeSpec,
    #[serde(default)]
    pub matchers: Vec<MatcherRule>,
}

/// Append-only record of one completed probe attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub ok: bool,
    pub message: String,
    pub color: String,
}

impl LogEntry {
    pub fn from_outcome(device_id: impl Into<String>, timestamp: DateTime<Utc>, outcome: &ProbeOutcome) -> Self {
        Self {
            id: None,
            device_id: device_id.into(),
            timestamp,
            ok: outcome.ok,
            message: outcome.message.clone(),
            color: outcome.color.clone(),
        }
    }
}
