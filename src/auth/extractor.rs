// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the acting account.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(actor): Auth) -> impl IntoResponse {
//!     // actor is Actor
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{Actor, AuthError, SessionContext};
use crate::state::AppState;

/// Extract the bearer token from the `Authorization` header.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Extractor for authenticated requests.
///
/// Rejects with 401 unless the bearer token verifies and its session is
/// still active.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_capsules(
///     Auth(actor): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<CapsuleSummary>>, ApiError> {
///     // actor.account_id is the caller
/// }
/// ```
pub struct Auth(pub Actor);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let actor = state.sessions.authenticate_token(token)?;
        Ok(Auth(actor))
    }
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub Actor);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(actor) = Auth::from_request_parts(parts, state).await?;

        if !actor.is_admin() {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminOnly(actor))
    }
}

/// Optional authentication extractor.
///
/// Never rejects: a missing or invalid token yields
/// `SessionContext::Anonymous`.
pub struct OptionalAuth(pub SessionContext);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(actor)) => Ok(OptionalAuth(SessionContext::Authenticated(actor))),
            Err(_) => Ok(OptionalAuth(SessionContext::Anonymous)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::http::Request;
    use tempfile::TempDir;

    fn create_test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config =
            ServerConfig::for_data_dir(temp_dir.path()).with_password_hash_iterations(1_000);
        let state = AppState::open(&config).expect("Failed to open state");
        (state, temp_dir)
    }

    fn parts_with(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn login(state: &AppState, username: &str) -> String {
        let account = state.credentials.register(username, "pw").unwrap();
        state.sessions.establish(&account).unwrap().token
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _temp_dir) = create_test_state();
        let mut parts = parts_with(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_non_bearer_scheme() {
        let (state, _temp_dir) = create_test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic YWxpY2U6cHc=")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_session_token() {
        let (state, _temp_dir) = create_test_state();
        let token = login(&state, "alice");
        let mut parts = parts_with(Some(&token));

        let Auth(actor) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(actor.username, "alice");
    }

    #[tokio::test]
    async fn admin_only_rejects_non_admin() {
        let (state, _temp_dir) = create_test_state();
        let token = login(&state, "alice");
        let mut parts = parts_with(Some(&token));

        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn admin_only_accepts_admin() {
        let (state, _temp_dir) = create_test_state();
        state.credentials.register("root", "pw").unwrap();
        let mut promoted = state.credentials.promote_admins(&["root".to_string()]).unwrap();
        let root = promoted.remove(0);
        let token = state.sessions.establish(&root).unwrap().token;
        let mut parts = parts_with(Some(&token));

        let AdminOnly(actor) = AdminOnly::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(actor.is_admin());
    }

    #[tokio::test]
    async fn optional_auth_returns_anonymous_without_token() {
        let (state, _temp_dir) = create_test_state();
        let mut parts = parts_with(Some("garbage"));

        let OptionalAuth(context) = OptionalAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(context, SessionContext::Anonymous);
    }
}
