// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service error taxonomy and its HTTP mapping.
//!
//! [`ServiceError`] is what the credential store, session manager and
//! capsule lifecycle return. Handlers convert it into [`ApiError`], which
//! renders as `{"error": "..."}` with the matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;

use crate::storage::StorageError;

/// Rejected input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid release date `{input}`: expected YYYY-MM-DD")]
    InvalidDateFormat { input: String },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("invalid link: {0}")]
    InvalidLink(String),
}

/// Expected, recoverable outcomes of a service operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("username already exists")]
    DuplicateUsername,

    /// Unknown user and wrong password are deliberately indistinguishable
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("capsule not found")]
    NotFound,

    #[error("you don't have permission to access this capsule")]
    Forbidden,

    /// Content requested before the release date
    #[error("capsule is sealed until {available_on}")]
    Sealed { available_on: NaiveDate },

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => ServiceError::NotFound,
            other => ServiceError::Storage(other),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn locked(message: impl Into<String>) -> Self {
        Self::new(StatusCode::LOCKED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::DuplicateUsername => ApiError::conflict(e.to_string()),
            ServiceError::InvalidCredentials | ServiceError::Unauthenticated => {
                ApiError::unauthorized(e.to_string())
            }
            ServiceError::Validation(ref v) => ApiError::unprocessable(v.to_string()),
            ServiceError::NotFound => ApiError::not_found(e.to_string()),
            ServiceError::Forbidden => ApiError::forbidden(e.to_string()),
            ServiceError::Sealed { .. } => ApiError::locked(e.to_string()),
            ServiceError::Storage(ref inner) => {
                tracing::error!(error = %inner, "Storage failure while handling request");
                ApiError::internal("Internal storage error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let unp = ApiError::unprocessable("oops");
        assert_eq!(unp.status, StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(ApiError::locked("later").status, StatusCode::LOCKED);
    }

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::DuplicateUsername, StatusCode::CONFLICT),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                ServiceError::Validation(ValidationError::EmptyField("content")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ServiceError::NotFound, StatusCode::NOT_FOUND),
            (ServiceError::Forbidden, StatusCode::FORBIDDEN),
            (
                ServiceError::Sealed {
                    available_on: NaiveDate::from_ymd_opt(2031, 1, 1).unwrap(),
                },
                StatusCode::LOCKED,
            ),
            (
                ServiceError::Storage(StorageError::NotInitialized),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn storage_not_found_becomes_not_found() {
        let err: ServiceError = StorageError::NotFound("Capsule 1".into()).into();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[test]
    fn storage_errors_do_not_leak_details() {
        let err = ApiError::from(ServiceError::Storage(StorageError::IntegrityViolation(
            "secret path /data/x".into(),
        )));
        assert_eq!(err.message, "Internal storage error");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
