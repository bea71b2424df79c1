//! Error type for upstream HTTP calls.
//!
//! [`UpstreamError`] covers every way a single call to NewsAPI, OpenAI or
//! ElevenLabs can fail: transport failures, non-2xx statuses and bodies that
//! do not have the documented shape. It integrates into the crate-wide
//! [`Error`](crate::Error) via `Error::Upstream`.

use std::fmt;

use serde_json::Value;

use super::Provider;

/// Categories of upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpstreamErrorKind {
    /// The credential was rejected (HTTP 401 or a provider auth code).
    Auth,
    /// The credential is valid but not allowed to do this (HTTP 403).
    PermissionDenied,
    /// Rate limit or quota exceeded (HTTP 429).
    RateLimited,
    /// Any other non-2xx status.
    HttpStatus,
    /// Connection, DNS, TLS or timeout failure.
    Network,
    /// A 2xx response whose body did not have the expected shape.
    ResponseFormat,
}

/// A failed call to one upstream service.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    /// The service that failed.
    pub provider: Provider,
    /// The failure category.
    pub kind: UpstreamErrorKind,
    /// HTTP status, when the service answered.
    pub status: Option<u16>,
    /// Human-readable detail, preferably the provider's own message.
    pub message: String,
}

impl UpstreamError {
    /// Create an error of an explicit kind.
    #[must_use]
    pub fn new(
        provider: Provider,
        kind: UpstreamErrorKind,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            kind,
            status,
            message: message.into(),
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(provider: Provider, message: impl Into<String>) -> Self {
        Self::new(provider, UpstreamErrorKind::Network, None, message)
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(
        provider: Provider,
        expected: impl fmt::Display,
        got: impl fmt::Display,
    ) -> Self {
        Self::new(
            provider,
            UpstreamErrorKind::ResponseFormat,
            None,
            format!("expected {expected}, got {got}"),
        )
    }

    /// Classify a transport-level failure.
    #[must_use]
    pub fn from_reqwest(provider: Provider, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(provider, "request timed out")
        } else if err.is_connect() {
            Self::network(provider, format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::response_format(provider, "a readable body", err)
        } else {
            Self::network(provider, err.to_string())
        }
    }

    /// Build an error from a non-2xx status and its body.
    ///
    /// The provider's own error message is used when the body is one of the
    /// JSON error shapes the three services return; otherwise the raw body.
    #[must_use]
    pub fn parse(provider: Provider, status: u16, body: &str) -> Self {
        let kind = match status {
            401 => UpstreamErrorKind::Auth,
            403 => UpstreamErrorKind::PermissionDenied,
            429 => UpstreamErrorKind::RateLimited,
            _ => UpstreamErrorKind::HttpStatus,
        };

        let message = extract_message(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_owned()
            } else {
                trimmed.to_owned()
            }
        });

        Self::new(provider, kind, Some(status), message)
    }

    /// A hint for the failures users most commonly hit.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self.kind {
            UpstreamErrorKind::Auth => Some("the API key was rejected; check that it is valid"),
            UpstreamErrorKind::PermissionDenied => {
                Some("the API key is not allowed to use this endpoint or plan")
            }
            UpstreamErrorKind::RateLimited => {
                Some("rate limit or quota exceeded; wait before running again")
            }
            UpstreamErrorKind::Network => Some("check network connectivity and the endpoint URL"),
            UpstreamErrorKind::HttpStatus => match self.status {
                Some(500..=599) => Some("the service is having problems; try again later"),
                _ => None,
            },
            UpstreamErrorKind::ResponseFormat => None,
        }
    }

    /// Whether repeating the same request could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self.kind {
            UpstreamErrorKind::RateLimited | UpstreamErrorKind::Network => true,
            UpstreamErrorKind::HttpStatus => matches!(self.status, Some(500..=599)),
            _ => false,
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.provider)?;
        if let Some(status) = self.status {
            write!(f, "HTTP {status}: ")?;
        }
        f.write_str(&self.message)
    }
}

impl std::error::Error for UpstreamError {}

/// Pull a message out of the known JSON error bodies.
///
/// - OpenAI: `{"error": {"message": ...}}`
/// - NewsAPI: `{"status": "error", "message": ...}`
/// - ElevenLabs: `{"detail": {"message": ...}}` or `{"detail": "..."}`
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    ["/error/message", "/message", "/detail/message", "/detail"]
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
        .map(str::to_owned)
}
