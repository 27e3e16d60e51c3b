//! TCP connect probe
//!
//! A connection that completes within the timeout is always a pass;
//! matcher rules run against the literal `"tcp-ok"` and can only change
//! the color. Connection failures are returned as errors.

use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tracing::{instrument, trace};

use crate::device::{MatcherRule, ProbeOutcome, TcpProbe};
use crate::matcher::classify;

use super::error::{ProbeError, ProbeResult};

pub const TCP_OK_TEXT: &str = "tcp-ok";

#[instrument(skip_all, fields(host = %probe.host, port = probe.port))]
pub async fn probe_tcp(
    probe: &TcpProbe,
    matchers: &[MatcherRule],
    timeout: Duration,
) -> ProbeResult<ProbeOutcome> {
    let target = format!("{}:{}", probe.host, probe.port);
    let started = Instant::now();

    let connect = TcpStream::connect((probe.host.as_str(), probe.port));
    let stream = match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(ProbeError::io(target, e)),
        Err(_) => {
            return Err(ProbeError::Timeout {
                target,
                after: timeout,
            });
        }
    };
    let elapsed = started.elapsed();
    drop(stream);
    trace!("connected in {}ms", elapsed.as_millis());

    let (ok, color) = classify(matchers, TCP_OK_TEXT).resolve(true);
    let message = format!("TCP {} connected in {}ms", target, elapsed.as_millis());

    Ok(ProbeOutcome::new(ok, color, message, elapsed))
}
