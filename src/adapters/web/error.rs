//! HTTP error responses for web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::error::{ErrorKind, LedgerError};

/// Generic message returned for internal failures; the cause is only logged.
pub const INTERNAL_MESSAGE: &str = "ERROR";

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Sale failures: every business rejection, including an unknown stock,
    /// is a 400; anything else is a 500 that echoes the cause in `details`.
    pub fn from_sale_error(err: LedgerError) -> Self {
        if err.is_rejection() {
            tracing::warn!(error = ?err, "sale rejected");
            return Self::bad_request(err.to_string());
        }
        tracing::error!(error = ?err, "sale failed");
        Self::internal().with_details(err.to_string())
    }
}

pub fn status_from_error(err: &LedgerError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Storage | ErrorKind::Config | ErrorKind::Io => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<LedgerError> for WebError {
    fn from(err: LedgerError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            tracing::error!(error = ?err, "request failed");
            return Self::internal();
        }
        tracing::warn!(error = ?err, "request rejected");
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: &self.message,
            details: self.details.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
