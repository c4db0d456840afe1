use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced to the caller of a digest request.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors an adapter reports for its own source.
///
/// These never reach the caller; the aggregator records them next to an
/// empty item list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                UpstreamError::Unavailable(format!("rate limited (HTTP {})", status.as_u16()))
            }
            StatusCode::FORBIDDEN => {
                UpstreamError::Unavailable(format!("forbidden (HTTP {})", status.as_u16()))
            }
            _ => UpstreamError::Unavailable(format!("HTTP {}", status)),
        }
    }

    /// Like [`from_status`](Self::from_status), but a 403 that carries an
    /// exhausted quota or a `Retry-After` is reported as rate limiting.
    pub fn from_response(status: StatusCode, headers: &HeaderMap) -> Self {
        if status == StatusCode::FORBIDDEN && is_rate_limited(headers) {
            return UpstreamError::Unavailable(format!("rate limited (HTTP {})", status.as_u16()));
        }
        UpstreamError::from_status(status)
    }
}

// GitHub sends an integer remaining count, Reddit a float
fn is_rate_limited(headers: &HeaderMap) -> bool {
    if headers.contains_key(RETRY_AFTER) {
        return true;
    }
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .is_some_and(|remaining| remaining <= 0.0)
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            UpstreamError::from_status(status)
        } else {
            UpstreamError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Malformed(err.to_string())
    }
}
