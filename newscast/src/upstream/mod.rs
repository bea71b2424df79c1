//! Shared plumbing for the three upstream HTTP services.
//!
//! Every request to a provider goes through [`Credential::authorize`] so the
//! per-provider authentication convention lives in exactly one place, and
//! through [`execute`] so status handling and the optional retry policy are
//! applied uniformly.

mod auth;
mod error;

pub use auth::{AuthScheme, Credential, Provider};
pub use error::{UpstreamError, UpstreamErrorKind};

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};

use crate::retry::{RetryConfig, with_backoff};

/// Build the HTTP client shared by one upstream.
///
/// `timeout_secs` of `None` or `Some(0)` keeps the transport's default behavior.
pub(crate) fn build_client(
    provider: Provider,
    timeout_secs: Option<u64>,
) -> Result<Client, UpstreamError> {
    let mut builder = Client::builder();
    if let Some(timeout) = request_timeout(timeout_secs) {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(|e| {
        UpstreamError::network(provider, format!("failed to create HTTP client: {e}"))
    })
}

/// Zero means no timeout.
fn request_timeout(timeout_secs: Option<u64>) -> Option<Duration> {
    timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
}

/// Send one request and turn non-2xx responses into an [`UpstreamError`].
pub(crate) async fn send(
    provider: Provider,
    request: RequestBuilder,
) -> Result<Response, UpstreamError> {
    let response = request
        .send()
        .await
        .map_err(|e| UpstreamError::from_reqwest(provider, &e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::parse(provider, status.as_u16(), &body));
    }

    Ok(response)
}

/// Send a request built by `build`, retrying transient failures per `retry`.
///
/// The builder is invoked once per attempt since a sent request is consumed.
pub(crate) async fn execute<F>(
    provider: Provider,
    retry: &RetryConfig,
    build: F,
) -> Result<Response, UpstreamError>
where
    F: Fn() -> RequestBuilder,
{
    with_backoff(retry, || send(provider, build())).await
}
