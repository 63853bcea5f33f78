//! Shared HTTP plumbing and failure classification.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::SourceError;

/// User agent sent with every request (GitHub rejects requests without one).
pub const USER_AGENT: &str = concat!("herald/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout. Fetches are never cancelled mid-flight by
/// the runtime, so this bounds how long a tick can hang on a dead peer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the HTTP client shared by all adapters.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Classifies a non-success HTTP status.
pub fn classify_status(status: StatusCode, headers: &HeaderMap, context: &str) -> SourceError {
    let message = format!("{} returned {}", context, status);

    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        return SourceError::transient(message);
    }

    // GitHub signals primary and secondary rate limits with 403.
    if status == StatusCode::FORBIDDEN {
        let exhausted = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0");
        if exhausted || headers.contains_key(RETRY_AFTER) {
            return SourceError::transient(format!("{} (rate limited)", message));
        }
    }

    SourceError::fatal(message)
}

/// Classifies a transport-level failure.
pub fn classify_error(err: &reqwest::Error, context: &str) -> SourceError {
    if let Some(status) = err.status() {
        return classify_status(status, &HeaderMap::new(), context);
    }
    if err.is_decode() || err.is_builder() {
        return SourceError::fatal(format!("{}: {}", context, err));
    }
    SourceError::transient(format!("{}: {}", context, err))
}

/// Sends a request and decodes a JSON body.
///
/// Transport failures and retryable statuses are transient; other statuses
/// and bodies that do not match the expected schema are fatal.
pub async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    context: &str,
) -> Result<T, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_error(&e, context))?;

    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(status, response.headers(), context));
    }

    let body = response
        .text()
        .await
        .map_err(|e| classify_error(&e, context))?;
    trace!(context, bytes = body.len(), "received response body");

    serde_json::from_str(&body)
        .map_err(|e| SourceError::fatal(format!("{}: unexpected response schema: {}", context, e)))
}
