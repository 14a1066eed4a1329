use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Generic reason shown when the report service fails without saying why.
pub const GENERIC_REPORT_FAILURE: &str = "Failed to generate PDF";

/// Application-specific error types for the HTTP surface.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Request body could not be read as an assessment snapshot.
    BadRequest(String),
    /// Assessment snapshot rejected by validation; the previous snapshot is kept.
    InvalidAssessment(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InvalidAssessment(msg) => write!(f, "Invalid assessment: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => {
                tracing::warn!("Rejected request body: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::InvalidAssessment(msg) => {
                tracing::warn!("Rejected assessment snapshot: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return source.into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Failure of one report attempt.
///
/// `Display` produces the human-readable reason stored in
/// [`crate::models::DownloadState::Failed`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReportError {
    /// The request never got a response (connection refused, DNS, TLS...).
    Transport(String),
    /// No response within the configured timeout.
    Timeout,
    /// Non-success status, with the service's own explanation when it gave one.
    Service { status: u16, detail: Option<String> },
    /// A success status whose body could not be used as a report.
    Malformed(String),
    /// Circuit breaker is open after repeated failures.
    Unavailable,
    /// The artifact arrived but could not be written.
    Save(String),
    /// The attempt was dropped before reaching a terminal state.
    Interrupted,
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Transport(msg) => write!(f, "Report service unreachable: {}", msg),
            ReportError::Timeout => write!(f, "Report service timed out"),
            ReportError::Service { detail, .. } => {
                write!(f, "{}", detail.as_deref().unwrap_or(GENERIC_REPORT_FAILURE))
            }
            ReportError::Malformed(msg) => write!(f, "Malformed report response: {}", msg),
            ReportError::Unavailable => write!(
                f,
                "Report service temporarily unavailable, try again shortly"
            ),
            ReportError::Save(msg) => write!(f, "Could not save report: {}", msg),
            ReportError::Interrupted => write!(f, "Report generation was interrupted"),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReportError::Timeout
        } else if err.is_decode() || err.is_body() {
            ReportError::Malformed(err.to_string())
        } else {
            ReportError::Transport(err.to_string())
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_uses_generic_reason_without_detail() {
        let err = ReportError::Service {
            status: 500,
            detail: None,
        };
        assert_eq!(err.to_string(), "Failed to generate PDF");
    }

    #[test]
    fn test_service_error_prefers_service_detail() {
        let err = ReportError::Service {
            status: 422,
            detail: Some("dosha_results missing".to_string()),
        };
        assert_eq!(err.to_string(), "dosha_results missing");
    }

    #[test]
    fn test_context_wraps_source() {
        let result: Result<(), AppError> =
            Err(AppError::InvalidAssessment("empty dosha_results".to_string()));
        let err = result.context("replacing assessment").unwrap_err();
        assert_eq!(
            err.to_string(),
            "replacing assessment: Invalid assessment: empty dosha_results"
        );
    }

    #[test]
    fn test_context_status_follows_source() {
        let err = AppError::WithContext {
            source: Box::new(AppError::BadRequest("expected value".to_string())),
            context: "replacing assessment".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
