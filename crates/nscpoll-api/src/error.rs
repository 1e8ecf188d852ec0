use thiserror::Error;

use crate::status;

/// Synthetic HTTP status reported when a request outruns its timeout budget.
pub const TIMEOUT_STATUS: u16 = 408;

/// Top-level error type for the `nscpoll-api` crate.
///
/// Every failed query settles into exactly one of these variants.
/// `nscpoll-core` maps them onto the device reachability signal.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request did not settle within its timeout budget.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// The agent answered with a status other than 200.
    #[error("HTTP error [{status}] {reason}")]
    Http { status: u16, reason: &'static str },
}

impl Error {
    /// Build an [`Error::Http`] for a status code, looking up its reason phrase.
    pub fn http(status: u16) -> Self {
        Self::Http {
            status,
            reason: status::reason_phrase(status),
        }
    }

    /// Returns `true` if retrying on the next poll cycle might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status == TIMEOUT_STATUS || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status carried by this error, synthetic 408 for timeouts.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Timeout { .. } => Some(TIMEOUT_STATUS),
            Self::Transport(e) if e.is_timeout() => Some(TIMEOUT_STATUS),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Short machine-readable error code, used as the log prefix for failures.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(e) if e.is_timeout() => "ETIMEDOUT",
            Self::Transport(e) if e.is_connect() => "ECONNREFUSED",
            Self::Transport(e) if e.is_body() || e.is_decode() => "EBODY",
            Self::Transport(_) => "EREQUEST",
            Self::InvalidUrl(_) => "EINVALIDURL",
            Self::Timeout { .. } => "ETIMEDOUT",
            Self::Tls(_) => "ETLS",
            Self::Http { .. } => "EHTTP",
        }
    }
}
