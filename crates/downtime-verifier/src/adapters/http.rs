//! Shared HTTP plumbing for the REST and JSON-RPC adapters.

use std::time::Duration;

/// Prefix `http://` when no scheme is given and drop trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// HTTP client with a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Body text trimmed for error messages.
pub(crate) async fn body_text(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .map(|body| body.trim().to_string())
        .unwrap_or_default()
}
