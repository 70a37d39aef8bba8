// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Rejections from the [`Auth`](super::Auth) extractors render as
//! `{"error": ..., "error_code": ...}`. 401 responses carry a bearer
//! challenge so clients know to log in again.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a request could not be resolved to an authenticated actor.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingAuthHeader,

    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    #[error("Token is malformed")]
    MalformedToken,

    /// Signed with another secret, or tampered with
    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Session has expired")]
    TokenExpired,

    #[error("Token was not issued by this service")]
    InvalidIssuer,

    /// The session record is gone (logout or sweep)
    #[error("Session is no longer active")]
    SessionRevoked,

    #[error("Admin role required")]
    InsufficientPermissions,

    /// Session store failure; the detail is logged, never returned
    #[error("Authentication backend failure")]
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: &'static str,
}

impl AuthError {
    /// Machine-readable code for clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::SessionRevoked => "session_revoked",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// RFC 6750 challenge for 401 responses.
    fn challenge(&self) -> Option<HeaderValue> {
        match self {
            AuthError::MissingAuthHeader => Some(HeaderValue::from_static("Bearer")),
            AuthError::InsufficientPermissions | AuthError::InternalError(_) => None,
            _ => Some(HeaderValue::from_static("Bearer error=\"invalid_token\"")),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::InternalError(ref detail) = self {
            tracing::error!(error = %detail, "Session lookup failed");
        }

        let status = self.status_code();
        let challenge = self.challenge();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code(),
        });

        let mut response = (status, body).into_response();
        if let Some(value) = challenge {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_header_challenges_for_bearer() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");

        let body = body_json(response).await;
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn revoked_session_is_an_invalid_token() {
        let response = AuthError::SessionRevoked.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[WWW_AUTHENTICATE],
            "Bearer error=\"invalid_token\""
        );
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let response = AuthError::InternalError("redb: disk full".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());

        let body = body_json(response).await;
        assert_eq!(body["error"], "Authentication backend failure");
    }

    #[test]
    fn non_admin_is_forbidden() {
        let err = AuthError::InsufficientPermissions;
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.challenge().is_none());
    }
}
