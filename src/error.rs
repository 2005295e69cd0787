use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::api::response;

/// Errors that reject a whole request before or instead of running a batch.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::ConfigError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        response::error(status, self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Classification of a single link's failure, as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    TransportError,
    Timeout,
    HttpError,
    ExtractionError,
    SummarizationError,
    InternalError,
}

/// Failure of one link's pipeline. Never aborts the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Transport(String),

    #[error("Request timeout after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("{0}")]
    Extraction(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("Worker stopped before finishing this link")]
    WorkerAborted,
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            ScrapeError::Transport(_) => ErrorKind::TransportError,
            ScrapeError::Timeout(_) => ErrorKind::Timeout,
            ScrapeError::HttpStatus(_) => ErrorKind::HttpError,
            ScrapeError::Extraction(_) => ErrorKind::ExtractionError,
            ScrapeError::Summarization(_) => ErrorKind::SummarizationError,
            ScrapeError::WorkerAborted => ErrorKind::InternalError,
        }
    }

    /// Upstream HTTP status, only present for non-2xx responses.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ScrapeError::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }
}

/// Errors raised by the external summarization provider.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("AI processing unavailable - Gemini API key not configured")]
    MissingCredential,

    #[error("request to provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response format from LLM")]
    InvalidResponse,

    #[error("provider call timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

impl From<LlmError> for ScrapeError {
    fn from(err: LlmError) -> Self {
        ScrapeError::Summarization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_http_errors_carry_status_code() {
        assert_eq!(ScrapeError::HttpStatus(404).status_code(), Some(404));
        assert_eq!(ScrapeError::Timeout(Duration::from_secs(30)).status_code(), None);
        assert_eq!(ScrapeError::Transport("refused".into()).status_code(), None);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ScrapeError::HttpStatus(500).kind()).unwrap();
        assert_eq!(json, "\"http_error\"");
        let json = serde_json::to_string(&ScrapeError::WorkerAborted.kind()).unwrap();
        assert_eq!(json, "\"internal_error\"");
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(ScrapeError::HttpStatus(404).to_string(), "HTTP 404");
        assert_eq!(
            ScrapeError::Timeout(Duration::from_secs(30)).to_string(),
            "Request timeout after 30s"
        );
        assert_eq!(
            ScrapeError::from(LlmError::MissingCredential).kind(),
            ErrorKind::SummarizationError
        );
    }

    #[test]
    fn test_invalid_request_message_is_verbatim() {
        let err = AppError::InvalidRequest("At least one link is required".into());
        assert_eq!(err.to_string(), "At least one link is required");
    }
}
