//! Closed error taxonomy for analytics API calls.
//!
//! Every transport or protocol failure is folded into one of these variants
//! before it reaches a result slot; callers never see raw HTTP or socket
//! errors.

use std::fmt;

/// Terminal outcome of one fetch attempt. None of these are retried
/// automatically; each slot offers a manual retry instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiError {
    /// 404 — the profile does not exist on GitHub.
    NotFound,
    /// 403 — upstream GitHub rate limit reached.
    RateLimited,
    /// 422 — the backend rejected a parameter; carries the first structured
    /// message from the response body when one is present.
    Validation(String),
    /// 500/502 — backend failure, message extracted from the body if any.
    Server(String),
    /// The call exceeded its timeout budget and was cancelled.
    Timeout,
    /// Anything else: unexpected status, connection failure, bad JSON.
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound => write!(f, "profile not found"),
            ApiError::RateLimited => write!(f, "API rate limit reached, try again later"),
            ApiError::Validation(msg) => write!(f, "invalid request: {msg}"),
            ApiError::Server(msg) => write!(f, "server error: {msg}"),
            ApiError::Timeout => write!(f, "request timed out"),
            ApiError::Other(msg) => write!(f, "request failed: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Map a non-2xx HTTP status plus response body to the taxonomy.
    ///
    /// 422 and 5xx bodies are probed for a structured message
    /// (FastAPI-style `{"detail": [{"msg": ...}]}`, plain `detail`, or
    /// `message`); absent or unparsable bodies fall back to a generic text.
    pub fn from_status(status: u16, body: &str) -> ApiError {
        match status {
            404 => ApiError::NotFound,
            403 => ApiError::RateLimited,
            422 => ApiError::Validation(
                extract_detail(body).unwrap_or_else(|| "validation failed".to_string()),
            ),
            500 | 502 => ApiError::Server(
                extract_detail(body).unwrap_or_else(|| format!("HTTP {status}")),
            ),
            other => ApiError::Other(format!("unexpected HTTP status {other}")),
        }
    }
}

/// Pull the first human-readable message out of an error body.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = value.get("detail") {
        if let Some(s) = detail.as_str() {
            return Some(s.to_string());
        }
        // FastAPI validation errors: detail is a list of {loc, msg, type}
        if let Some(first) = detail.as_array().and_then(|a| a.first()) {
            if let Some(msg) = first.get("msg").and_then(|m| m.as_str()) {
                return Some(msg.to_string());
            }
        }
    }

    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}
