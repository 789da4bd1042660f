use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

pub const NOT_FOUND_MESSAGE: &str = "Expense not found";

/// Request-level failures, each carrying the message for the operation that failed
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input (400)
    #[error("{message}: {detail}")]
    Validation { message: &'static str, detail: String },

    /// The id does not resolve to an expense (404)
    #[error("Expense not found")]
    NotFound,

    /// Any other persistence failure (500)
    #[error("{message}: {detail}")]
    Storage { message: &'static str, detail: String },
}

impl ApiError {
    pub fn validation(message: &'static str, detail: impl ToString) -> Self {
        Self::Validation {
            message,
            detail: detail.to_string(),
        }
    }

    pub fn storage(message: &'static str, detail: impl ToString) -> Self {
        Self::Storage {
            message,
            detail: detail.to_string(),
        }
    }

    /// Map a store failure on a write that validates its input.
    /// Schema rejections are the caller's fault, everything else is ours.
    pub fn from_write(message: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Constraint(_) => Self::validation(message, err),
            other => Self::storage(message, other),
        }
    }

    /// Reject a body that does not fit the request schema
    pub fn from_rejection(message: &'static str, rejection: JsonRejection) -> Self {
        Self::validation(message, rejection.body_text())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Validation { message, detail } | ApiError::Storage { message, detail } => {
                ErrorBody {
                    message,
                    error: Some(detail.as_str()),
                }
            }
            ApiError::NotFound => ErrorBody {
                message: NOT_FOUND_MESSAGE,
                error: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
