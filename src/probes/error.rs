//! Error types for probe execution

use std::fmt;
use std::time::Duration;

use crate::util::error_chain;

/// Result type alias for probe execution
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Reasons a probe could not produce an outcome
///
/// Every variant ends up as a failed outcome (`ok=false`, red) whose
/// message is the `Display` form of the error.
#[derive(Debug)]
pub enum ProbeError {
    /// The device names a request type this build cannot execute
    UnsupportedRequestType(String),

    /// The HTTP method could not be parsed
    InvalidMethod(String),

    /// HTTP client could not be constructed
    ClientBuild(reqwest::Error),

    /// HTTP request failed before a response was received
    Http(reqwest::Error),

    /// Connecting did not finish within the probe timeout
    Timeout { target: String, after: Duration },

    /// Target host did not resolve to any address
    Unresolvable(String),

    /// Socket-level failure (refused, unreachable, DNS error, ...)
    Io {
        target: String,
        source: std::io::Error,
    },
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::UnsupportedRequestType(kind) => {
                write!(f, "unsupported requestType: {}", kind)
            }
            ProbeError::InvalidMethod(method) => write!(f, "invalid HTTP method: {}", method),
            ProbeError::ClientBuild(err) => {
                write!(f, "failed to build HTTP client: {}", error_chain(err))
            }
            ProbeError::Http(err) => write!(f, "{}", error_chain(err)),
            ProbeError::Timeout { target, after } => {
                write!(f, "{}: timeout after {}ms", target, after.as_millis())
            }
            ProbeError::Unresolvable(target) => write!(f, "{}: no addresses resolved", target),
            ProbeError::Io { target, source } => write!(f, "{}: {}", target, source),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::ClientBuild(err) | ProbeError::Http(err) => Some(err),
            ProbeError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl ProbeError {
    pub fn io(target: impl Into<String>, source: std::io::Error) -> Self {
        ProbeError::Io {
            target: target.into(),
            source,
        }
    }

    /// Configuration errors are never fixed by retrying.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ProbeError::UnsupportedRequestType(_) | ProbeError::InvalidMethod(_)
        )
    }
}
