//! Protocol probe executors
//!
//! `ProbeExecutor` owns the shared HTTP client and the per-protocol
//! timeouts, and dispatches a [`ProbeSpec`] to the matching executor:
//!
//! ```text
//! ProbeSpec ─┬─ Http ──► probe_http  (reqwest, any status accepted)
//!            ├─ Tcp  ──► probe_tcp   (connect within 4s)
//!            ├─ Udp  ──► probe_udp   (one datagram, wait 3s for a reply)
//!            └─ Unsupported ──► ProbeError::UnsupportedRequestType
//! ```
//!
//! `execute` surfaces transport and configuration failures as
//! [`ProbeError`]; the scheduler and the manual trigger turn those into
//! failed outcomes.

pub mod error;
pub mod http;
pub mod tcp;
pub mod udp;

use std::time::{Duration, Instant};

use tracing::{instrument, warn};

use crate::device::{MatcherRule, ProbeOutcome, ProbeRequest, ProbeSpec};

pub use error::{ProbeError, ProbeResult};

/// Upper bounds for each protocol's network wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    pub http: Duration,
    pub tcp: Duration,
    pub udp: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            http: Duration::from_secs(10),
            tcp: Duration::from_secs(4),
            udp: Duration::from_secs(3),
        }
    }
}

/// Executes probes; cheap to share behind an `Arc`
#[derive(Debug, Clone)]
pub struct ProbeExecutor {
    client: reqwest::Client,
    timeouts: ProbeTimeouts,
}

impl ProbeExecutor {
    pub fn new(timeouts: ProbeTimeouts) -> ProbeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeouts.http)
            .build()
            .map_err(ProbeError::ClientBuild)?;

        Ok(Self { client, timeouts })
    }

    pub fn timeouts(&self) -> ProbeTimeouts {
        self.timeouts
    }

    /// Run one probe and classify its response with `matchers`
    #[instrument(skip_all, fields(request_type = %spec.request_type(), target = %spec.target()))]
    pub async fn execute(
        &self,
        spec: &ProbeSpec,
        matchers: &[MatcherRule],
    ) -> ProbeResult<ProbeOutcome> {
        match spec {
            ProbeSpec::Http(probe) => http::probe_http(&self.client, probe, matchers).await,
            ProbeSpec::Tcp(probe) => tcp::probe_tcp(probe, matchers, self.timeouts.tcp).await,
            ProbeSpec::Udp(probe) => udp::probe_udp(probe, matchers, self.timeouts.udp).await,
            ProbeSpec::Unsupported { request_type, .. } => {
                Err(ProbeError::UnsupportedRequestType(request_type.clone()))
            }
        }
    }

    /// Run a probe and fold any error into a failed outcome.
    pub async fn execute_or_fail(&self, spec: &ProbeSpec, matchers: &[MatcherRule]) -> ProbeOutcome {
        let started = Instant::now();
        match self.execute(spec, matchers).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(config_error = e.is_config_error(), "probe failed: {}", e);
                ProbeOutcome::failure(e.to_string(), started.elapsed())
            }
        }
    }

    /// Manual "test now": same executors, nothing persisted.
    pub async fn run_now(&self, request: &ProbeRequest) -> ProbeOutcome {
        self.execute_or_fail(&request.probe, &request.matchers).await
    }
}
