use std::time::Duration;

use axum::http;
use reqwest::Client;

use crate::error::{ImageGenError, Result};

/// Build an HTTP client with a whole-request timeout
///
/// One client is built per outbound concern (fetching, upstream calls)
/// and shared across requests so connections are pooled.
pub fn http_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    let mut headers = http::HeaderMap::new();
    headers.insert(http::header::CONNECTION, http::HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .user_agent(user_agent)
        .default_headers(headers)
        .build()
        .map_err(|e| ImageGenError::ConfigError(format!("failed to build HTTP client: {e}")))
}
