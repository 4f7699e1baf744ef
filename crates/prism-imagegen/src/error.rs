use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jiff::Timestamp;
use serde::Serialize;
use thiserror::Error;

use crate::validate::ValidationError;

pub type Result<T> = std::result::Result<T, ImageGenError>;

/// Error classes reported to clients in the `errorKind` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    AuthError,
    RateLimited,
    UpstreamBadRequest,
    Timeout,
    UpstreamUnreachable,
    Unexpected,
    NotFound,
}

/// Image generation service errors with appropriate HTTP status codes
#[derive(Debug, Error)]
pub enum ImageGenError {
    /// Request rejected before any upstream call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Request body is not valid JSON or has the wrong shape
    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    /// Download proxy called without a `url` query parameter
    #[error("URL parameter is required")]
    MissingUrl,

    /// Download proxy called with something that is not an http(s) URL
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    /// No upstream credential configured
    #[error("Server configuration error. API key not found.")]
    MissingCredential,

    /// Upstream rejected the credential
    #[error("API authentication failed. Please check your API key configuration.")]
    UpstreamAuth,

    /// Upstream throttled the request
    #[error("Rate limit exceeded. Please wait before making another request.")]
    RateLimited,

    /// Upstream rejected the parameters
    #[error("{0}")]
    UpstreamBadRequest(String),

    /// The upstream call did not finish within the configured timeout
    #[error("Request timeout. Image generation took too long. Please try again.")]
    Timeout,

    /// The upstream host could not be reached
    #[error("Unable to connect to image generation service. Please try again later.")]
    Unreachable,

    /// Anything else; `detail` is only set in development
    #[error("Image generation failed due to server error.")]
    Unexpected { detail: Option<String> },

    /// The image host did not answer within the download timeout
    #[error("Image download timed out. Please try again.")]
    DownloadTimeout,

    /// The image host could not be reached
    #[error("Unable to reach the image host. Please try again later.")]
    DownloadUnreachable,

    /// The image host answered with an error or the transfer failed
    #[error("Failed to download image.")]
    DownloadFailed { detail: Option<String> },

    /// Invalid configuration detected while building the server
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ImageGenError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::MalformedBody(_)
            | Self::MissingUrl
            | Self::InvalidUrl(_)
            | Self::UpstreamBadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamAuth => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout | Self::DownloadTimeout => StatusCode::REQUEST_TIMEOUT,
            Self::Unreachable | Self::DownloadUnreachable => StatusCode::SERVICE_UNAVAILABLE,
            Self::MissingCredential
            | Self::Unexpected { .. }
            | Self::DownloadFailed { .. }
            | Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error class for the response
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::MalformedBody(_) | Self::MissingUrl | Self::InvalidUrl(_) => {
                ErrorKind::ValidationError
            }
            Self::MissingCredential | Self::UpstreamAuth => ErrorKind::AuthError,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::UpstreamBadRequest(_) => ErrorKind::UpstreamBadRequest,
            Self::Timeout | Self::DownloadTimeout => ErrorKind::Timeout,
            Self::Unreachable | Self::DownloadUnreachable => ErrorKind::UpstreamUnreachable,
            Self::Unexpected { .. } | Self::DownloadFailed { .. } | Self::ConfigError(_) => ErrorKind::Unexpected,
        }
    }

    /// Specific rejection reason, for errors that carry one
    pub const fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Validation(e) => Some(e.reason()),
            Self::MalformedBody(_) => Some("MALFORMED_BODY"),
            Self::MissingUrl => Some("MISSING_URL"),
            Self::InvalidUrl(_) => Some("INVALID_URL"),
            _ => None,
        }
    }

    /// Message that is safe to expose to API consumers
    pub fn client_message(&self) -> String {
        match self {
            Self::ConfigError(_) => "Server configuration error.".to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation(e) => e.details(),
            Self::Unexpected { detail } | Self::DownloadFailed { detail } => Some(serde_json::Value::String(
                detail.clone().unwrap_or_else(|| "Internal server error".to_string()),
            )),
            _ => None,
        }
    }
}

/// Structured error body shared by every failing route
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
    pub error_kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: Timestamp,
}

impl ErrorBody {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            error_kind: kind,
            reason: None,
            details: None,
            timestamp: Timestamp::now(),
        }
    }
}

impl From<&ImageGenError> for ErrorBody {
    fn from(error: &ImageGenError) -> Self {
        Self {
            error: error.client_message(),
            error_kind: error.kind(),
            reason: error.reason(),
            details: error.details(),
            timestamp: Timestamp::now(),
        }
    }
}

impl IntoResponse for ImageGenError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
        }

        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(error: ImageGenError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_body() {
        let (status, json) = body_json(ValidationError::EmptyPrompt.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errorKind"], "VALIDATION_ERROR");
        assert_eq!(json["reason"], "EMPTY_PROMPT");
        assert_eq!(json["error"], "Prompt is required and cannot be empty");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unexpected_error_hides_detail_by_default() {
        let (status, json) = body_json(ImageGenError::Unexpected { detail: None }).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["errorKind"], "UNEXPECTED");
        assert_eq!(json["details"], "Internal server error");
        assert!(json.get("reason").is_none());
    }

    #[tokio::test]
    async fn config_error_message_is_generic() {
        let (_, json) = body_json(ImageGenError::ConfigError("api key for upstream missing".to_string())).await;
        assert_eq!(json["error"], "Server configuration error.");
    }

    #[test]
    fn missing_credential_is_a_server_side_auth_error() {
        let error = ImageGenError::MissingCredential;
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.kind(), ErrorKind::AuthError);
    }
}
