//! Shared HTTP plumbing for the provider clients.

use std::time::Duration;

use reqwest::{Client, Response};

use driftlog_core::{DriftlogError, Result};

/// Build a client with a per-request timeout.
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DriftlogError::http(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success status into an error carrying the response body.
pub(crate) async fn check_status(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DriftlogError::http(format!(
        "{} returned {}: {}",
        provider,
        status,
        truncate(&body, 500)
    )))
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
