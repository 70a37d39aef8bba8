// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Status of one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Ok,
    Unavailable,
}

impl ComponentStatus {
    fn probe<E: std::fmt::Display>(component: &'static str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => ComponentStatus::Ok,
            Err(e) => {
                tracing::warn!(component, error = %e, "Health check failed");
                ComponentStatus::Unavailable
            }
        }
    }
}

/// Per-dependency results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Media and audit files under the data root
    pub data_dir: ComponentStatus,
    /// Embedded redb database
    pub database: ComponentStatus,
}

impl HealthChecks {
    fn all_ok(&self) -> bool {
        self.data_dir == ComponentStatus::Ok && self.database == ComponentStatus::Ok
    }
}

/// Readiness response: overall status plus the individual checks.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// "ok" or "degraded"
    pub status: &'static str,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Probe storage and report whether requests can be served.
///
/// 503 if the data directory or the database is unusable.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Storage is unavailable", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let checks = HealthChecks {
        data_dir: ComponentStatus::probe("data_dir", state.files.health_check()),
        database: ComponentStatus::probe("database", state.database.health_check()),
    };

    if checks.all_ok() {
        (StatusCode::OK, Json(ReadyResponse { status: "ok", checks }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                status: "degraded",
                checks,
            }),
        )
    }
}

/// Liveness probe. The process answers, nothing else is checked.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is up", body = HealthResponse))
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness probe; same checks as `/health`.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to serve", body = ReadyResponse),
        (status = 503, description = "Not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[tokio::test]
    async fn healthy_storage_reports_ok() {
        let temp = tempfile::TempDir::new().unwrap();
        let state = AppState::open(
            &ServerConfig::for_data_dir(temp.path()).with_password_hash_iterations(1_000),
        )
        .unwrap();

        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.database, ComponentStatus::Ok);
        assert_eq!(body.checks.data_dir, ComponentStatus::Ok);
    }

    #[test]
    fn failed_probe_is_unavailable() {
        let status = ComponentStatus::probe("data_dir", Err("read-only filesystem"));
        assert_eq!(status, ComponentStatus::Unavailable);
        assert_eq!(serde_json::to_value(status).unwrap(), "unavailable");
    }

    #[tokio::test]
    async fn liveness_always_ok() {
        assert_eq!(liveness().await.0.status, "ok");
    }
}
