//! HTTP probe
//!
//! Any status code is a valid response here; only transport failures
//! (DNS, refused, timeout, a body cut short) are errors. The response
//! summary fed to the matcher is `"<status> <reason> <first 512 chars of body>"`,
//! with JSON bodies in their compact form.

use std::time::Instant;

use reqwest::header::CONTENT_TYPE;
use tracing::{instrument, trace};

use crate::device::{HttpProbe, MatcherRule, ProbeOutcome};
use crate::matcher::classify;

use super::error::{ProbeError, ProbeResult};

/// Number of body characters kept for matching and messages
pub const BODY_SAMPLE_CHARS: usize = 512;

#[instrument(skip_all, fields(method = %probe.method, url = %probe.url))]
pub async fn probe_http(
    client: &reqwest::Client,
    probe: &HttpProbe,
    matchers: &[MatcherRule],
) -> ProbeResult<ProbeOutcome> {
    let method = reqwest::Method::from_bytes(probe.method.as_bytes())
        .map_err(|_| ProbeError::InvalidMethod(probe.method.clone()))?;

    let started = Instant::now();

    let mut request = client.request(method, &probe.url);
    for (name, value) in &probe.headers {
        request = request.header(name, value);
    }
    if probe.sends_body() {
        request = attach_body(request, probe.body.as_ref());
    }

    let response = request.send().await.map_err(ProbeError::Http)?;
    let status = response.status();
    let raw = response.text().await.map_err(ProbeError::Http)?;
    let elapsed = started.elapsed();
    let text = body_text(raw);

    let sample: String = text.chars().take(BODY_SAMPLE_CHARS).collect();
    let reason = status.canonical_reason().unwrap_or("");
    trace!("received {} with {} body bytes", status.as_u16(), text.len());

    let summary = format!("{} {} {}", status.as_u16(), reason, sample);
    let passed = (200..400).contains(&status.as_u16());
    let (ok, color) = classify(matchers, &summary).resolve(passed);

    let message = format!(
        "{} {} in {}ms; body: {}",
        status.as_u16(),
        reason,
        elapsed.as_millis(),
        sample
    );

    Ok(ProbeOutcome::new(ok, color, message, elapsed))
}

/// JSON bodies are re-serialized compactly, a JSON string is unwrapped and
/// anything else is used as-is.
fn body_text(raw: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::String(text)) => text,
        Ok(value) => value.to_string(),
        Err(_) => raw,
    }
}

/// String bodies are sent verbatim (labelled as JSON when they parse as JSON),
/// anything else is serialized as a JSON document.
fn attach_body(
    request: reqwest::RequestBuilder,
    body: Option<&serde_json::Value>,
) -> reqwest::RequestBuilder {
    match body {
        None => request,
        Some(serde_json::Value::String(raw)) => {
            if serde_json::from_str::<serde_json::Value>(raw).is_ok() {
                request
                    .header(CONTENT_TYPE, "application/json")
                    .body(raw.clone())
            } else {
                request.body(raw.clone())
            }
        }
        Some(value) => request.json(value),
    }
}
