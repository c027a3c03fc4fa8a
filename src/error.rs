//! Errors surfaced by the `/api` endpoint and their JSON rendering.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::constants::MAX_MESSAGES;
use crate::fetcher::FetchError;
use crate::parser::ParseError;
use crate::selection::SelectionError;

/// Message returned for failures whose details must not leak to clients.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed query parameters.
    #[error("{0}")]
    Validation(String),
    /// The channel page could not be retrieved.
    #[error(transparent)]
    Upstream(#[from] FetchError),
    /// A requested index lies beyond the messages the page actually had.
    #[error("Message index {index} not found in last {} messages", MAX_MESSAGES)]
    NotFoundInWindow { index: usize },
    /// The extraction machinery could not be built. Shown to clients redacted.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<SelectionError> for ApiError {
    fn from(err: SelectionError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(err) => {
                StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::NotFoundInWindow { .. } => StatusCode::NOT_FOUND,
            Self::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client. Internal failures are redacted.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Parse(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Uniform error body: `{"error": true, "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: bool,
    pub message: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

/// Serialize `body` as pretty-printed JSON with the given status.
pub fn pretty_json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_string_pretty(body) {
        Ok(json) => (status, [(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => {
            tracing::error!("Failed to serialize response: {e}");
            internal_error_response()
        }
    }
}

/// The generic 500 body, built without going through serde. Also rendered for
/// handler panics.
#[must_use]
pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "application/json")],
        format!("{{\n  \"error\": true,\n  \"message\": \"{INTERNAL_ERROR_MESSAGE}\"\n}}"),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Parse(e) => tracing::error!("Parse error: {e}"),
            other => tracing::debug!(status = %status, error = %other, "Request failed"),
        }
        pretty_json(status, &ErrorBody::new(self.public_message()))
    }
}
