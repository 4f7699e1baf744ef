//! Upstream failure → client error table
//!
//! Kept separate from the HTTP calls so that every row can be tested
//! without a network.

use crate::error::ImageGenError;

/// Message used when the upstream 400 carries no usable detail
const DEFAULT_BAD_REQUEST: &str = "Invalid request parameters.";

/// What went wrong on the outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// Upstream answered with a non-success status
    Status { code: u16, body: String },
    /// The call exceeded the configured timeout
    Timeout,
    /// The connection could not be established
    Connect(String),
    /// Any other transport, decoding or protocol failure
    Other(String),
}

impl UpstreamFailure {
    /// Classify a transport error from the HTTP client
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Other(error.to_string())
        }
    }
}

/// Map an upstream failure to the error returned to the client
///
/// Each input maps to exactly one error class; `expose_details` controls
/// whether internal detail reaches the response of unexpected failures.
pub fn map_upstream_failure(failure: UpstreamFailure, expose_details: bool) -> ImageGenError {
    match failure {
        UpstreamFailure::Status { code: 401, .. } => ImageGenError::UpstreamAuth,
        UpstreamFailure::Status { code: 429, .. } => ImageGenError::RateLimited,
        UpstreamFailure::Status { code: 400, body } => {
            ImageGenError::UpstreamBadRequest(upstream_detail(&body).unwrap_or_else(|| DEFAULT_BAD_REQUEST.to_string()))
        }
        UpstreamFailure::Timeout => ImageGenError::Timeout,
        UpstreamFailure::Connect(_) => ImageGenError::Unreachable,
        UpstreamFailure::Status { code, body } => ImageGenError::Unexpected {
            detail: expose_details.then(|| format!("upstream returned status {code}: {body}")),
        },
        UpstreamFailure::Other(message) => ImageGenError::Unexpected {
            detail: expose_details.then_some(message),
        },
    }
}

/// Map a failed download from an arbitrary image host
///
/// Downloads carry no credential, so no status is reported as an
/// authentication or rate limit problem of this service.
pub fn map_download_failure(failure: UpstreamFailure, expose_details: bool) -> ImageGenError {
    match failure {
        UpstreamFailure::Timeout => ImageGenError::DownloadTimeout,
        UpstreamFailure::Connect(_) => ImageGenError::DownloadUnreachable,
        UpstreamFailure::Status { code, .. } => ImageGenError::DownloadFailed {
            detail: expose_details.then(|| format!("image host returned status {code}")),
        },
        UpstreamFailure::Other(message) => ImageGenError::DownloadFailed {
            detail: expose_details.then_some(message),
        },
    }
}

/// Extract the `error` field of an upstream JSON error body
///
/// Accepts both `{"error": "..."}` and `{"error": {"message": "..."}}`.
fn upstream_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;

    error
        .as_str()
        .or_else(|| error.get("message").and_then(serde_json::Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}
