// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login and logout.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::{Actor, OptionalAuth},
    error::{ApiError, ServiceError},
    models::{CredentialsRequest, SessionResponse},
    state::AppState,
    storage::{Account, AuditEvent, AuditEventType},
};

/// Run a password hashing operation off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Credential task failed");
            ApiError::internal("Internal error")
        })?
        .map_err(ApiError::from)
}

/// Create an account and log it in.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = CredentialsRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created, session opened", body = SessionResponse),
        (status = 409, description = "Username already exists"),
        (status = 422, description = "Invalid username or password"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let credentials = state.credentials.clone();
    let account: Account =
        blocking(move || credentials.register(&request.username, &request.password)).await?;

    state.audit.record(
        AuditEvent::new(AuditEventType::AccountRegistered)
            .with_account(account.id)
            .with_resource("account", account.id),
    );

    let session = state.sessions.establish(&account)?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Verify a username and password and open a session.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = CredentialsRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Session opened", body = SessionResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let credentials = state.credentials.clone();
    let username = request.username.clone();
    let result =
        blocking(move || credentials.authenticate(&request.username, &request.password)).await;

    let account = match result {
        Ok(account) => account,
        Err(e) => {
            state.audit.record(
                AuditEvent::new(AuditEventType::LoginFailed)
                    .with_details(serde_json::json!({ "username": username }))
                    .failed(e.message.clone()),
            );
            return Err(e);
        }
    };

    let session = state.sessions.establish(&account)?;
    state
        .audit
        .record(AuditEvent::new(AuditEventType::LoginSucceeded).with_account(account.id));
    Ok(Json(session.into()))
}

/// End the current session.
///
/// Always succeeds; the token, if any, stops working immediately.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    security(("bearer" = [])),
    responses((status = 204, description = "Logged out"))
)]
pub async fn logout(
    State(state): State<AppState>,
    OptionalAuth(context): OptionalAuth,
) -> Result<StatusCode, ApiError> {
    let actor: Option<Actor> = context.actor().cloned();
    state.sessions.logout(context)?;

    if let Some(actor) = actor {
        crate::audit_log!(state.audit, AuditEventType::LoggedOut, actor);
    }
    Ok(StatusCode::NO_CONTENT)
}
