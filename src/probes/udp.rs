//! UDP datagram probe
//!
//! Sends one datagram and waits for any reply on the same socket. Silence
//! is a normal outcome (many UDP services never answer a generic probe),
//! so it is reported through `ok` instead of an error.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

use tokio::net::{UdpSocket, lookup_host};
use tracing::{debug, instrument, trace};

use crate::device::{MatcherRule, ProbeOutcome, UdpProbe};
use crate::matcher::classify;

use super::error::{ProbeError, ProbeResult};

pub const UDP_REPLY_TEXT: &str = "udp-reply";
pub const UDP_NO_REPLY_TEXT: &str = "udp-no-reply";

const RECV_BUFFER_SIZE: usize = 2048;

#[instrument(skip_all, fields(host = %probe.host, port = probe.port))]
pub async fn probe_udp(
    probe: &UdpProbe,
    matchers: &[MatcherRule],
    timeout: Duration,
) -> ProbeResult<ProbeOutcome> {
    let target = format!("{}:{}", probe.host, probe.port);
    let started = Instant::now();

    let addr = resolve(&probe.host, probe.port, &target).await?;
    let got = exchange(addr, probe.payload.as_bytes(), timeout, &target).await?;
    let elapsed = started.elapsed();

    let text = if got { UDP_REPLY_TEXT } else { UDP_NO_REPLY_TEXT };
    let (ok, color) = classify(matchers, text).resolve(got);
    let message = format!(
        "UDP {} {} in {}ms",
        target,
        if got { "reply" } else { "no reply" },
        elapsed.as_millis()
    );

    Ok(ProbeOutcome::new(ok, color, message, elapsed))
}

/// First IPv4 address for the host, falling back to whatever resolved first.
async fn resolve(host: &str, port: u16, target: &str) -> ProbeResult<SocketAddr> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| ProbeError::io(target, e))?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ProbeError::Unresolvable(target.to_string()))
}

/// Send the payload and report whether any datagram came back before `timeout`.
///
/// The receive and the timer race inside `tokio::time::timeout`; whichever
/// finishes first resolves the exchange and the socket is dropped on return,
/// so a late reply is never read.
async fn exchange(
    addr: SocketAddr,
    payload: &[u8],
    timeout: Duration,
    target: &str,
) -> ProbeResult<bool> {
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local)
        .await
        .map_err(|e| ProbeError::io(target, e))?;
    socket
        .send_to(payload, addr)
        .await
        .map_err(|e| ProbeError::io(target, e))?;
    trace!("sent {} bytes", payload.len());

    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let got = match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await {
        Ok(Ok((len, from))) => {
            trace!("received {} bytes from {}", len, from);
            true
        }
        Ok(Err(e)) => {
            debug!("receive failed, treating as no reply: {}", e);
            false
        }
        Err(_) => false,
    };

    Ok(got)
}
