// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrative endpoints.
//!
//! Admins can remove any capsule and read the audit trail. They never get
//! to read a capsule's content.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;

use crate::{
    audit_log,
    auth::AdminOnly,
    capsules::RELEASE_DATE_FORMAT,
    error::ApiError,
    models::{AuditLogResponse, AuditQueryParams},
    state::AppState,
    storage::{AuditEvent, AuditEventType, CapsuleId},
};

const DEFAULT_AUDIT_LIMIT: usize = 100;
const MAX_AUDIT_LIMIT: usize = 1000;
const MAX_AUDIT_RANGE_DAYS: i64 = 31;

fn parse_day(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), RELEASE_DATE_FORMAT).map_err(|_| {
                ApiError::bad_request(format!("Invalid {field} format. Use YYYY-MM-DD."))
            })
        })
        .transpose()
}

/// Purge a capsule.
///
/// Removes any capsule regardless of owner. Admin only.
#[utoipa::path(
    delete,
    path = "/v1/admin/capsules/{capsule_id}",
    tag = "Admin",
    security(("bearer" = [])),
    params(("capsule_id" = u64, Path, description = "Capsule id")),
    responses(
        (status = 204, description = "Capsule purged"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "No such capsule")
    )
)]
pub async fn purge_capsule(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(capsule_id): Path<CapsuleId>,
) -> Result<StatusCode, ApiError> {
    state.capsules.purge_capsule(&admin, capsule_id)?;

    audit_log!(state.audit, AuditEventType::CapsulePurged, admin, "capsule", capsule_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Query audit logs.
///
/// Search and filter audit log entries by date range, account and event
/// type. Admin only.
#[utoipa::path(
    get,
    path = "/v1/admin/audit/events",
    tag = "Admin",
    params(AuditQueryParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Audit events", body = AuditLogResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn query_audit_logs(
    AdminOnly(_admin): AdminOnly,
    Query(params): Query<AuditQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    // Default date range: today only
    let start = parse_day(params.start_date.as_deref(), "start_date")?
        .unwrap_or_else(|| state.audit.today());
    let end = parse_day(params.end_date.as_deref(), "end_date")?.unwrap_or(start);

    if end < start {
        return Err(ApiError::bad_request("end_date is before start_date"));
    }
    if (end - start).num_days() >= MAX_AUDIT_RANGE_DAYS {
        return Err(ApiError::bad_request(format!(
            "Date range is limited to {MAX_AUDIT_RANGE_DAYS} days"
        )));
    }

    let mut events = state.audit.read_events_range(start, end).map_err(|e| {
        tracing::error!(error = %e, "Failed to read audit log");
        ApiError::internal("Failed to read audit log")
    })?;

    if let Some(account_id) = &params.account_id {
        events.retain(|e| e.account_id.as_deref() == Some(account_id.as_str()));
    }

    if let Some(event_type) = &params.event_type {
        events.retain(|e| {
            serde_json::to_value(&e.event_type)
                .ok()
                .and_then(|v| v.as_str().map(|s| s == event_type))
                .unwrap_or(false)
        });
    }

    let total = events.len();
    let limit = params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).min(MAX_AUDIT_LIMIT);
    let events: Vec<AuditEvent> = events.into_iter().take(limit).collect();

    Ok(Json(AuditLogResponse { events, total }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Actor;
    use crate::capsules::CreateCapsule;
    use crate::clock::ManualClock;
    use crate::config::ServerConfig;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (AppState, Actor, Actor, TempDir) {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig::for_data_dir(temp.path()).with_password_hash_iterations(1_000);
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2030, 5, 5, 10, 0, 0).unwrap());
        let state = AppState::with_clock(&config, Arc::new(clock)).unwrap();
        state.credentials.register("root", "pw").unwrap();
        let promoted = state.credentials.promote_admins(&["root".to_string()]).unwrap();
        let root = Actor::from_account(&promoted[0]);
        let alice = Actor::from_account(&state.credentials.register("alice", "pw").unwrap());
        (state, root, alice, temp)
    }

    fn query(event_type: Option<&str>) -> Query<AuditQueryParams> {
        Query(AuditQueryParams {
            start_date: None,
            end_date: None,
            account_id: None,
            event_type: event_type.map(str::to_string),
            limit: None,
        })
    }

    #[tokio::test]
    async fn purge_removes_foreign_capsule() {
        let (state, root, alice, _temp) = setup();
        let capsule = state
            .capsules
            .create_capsule(
                &alice,
                CreateCapsule {
                    name: "B1".to_string(),
                    content: "secret".to_string(),
                    release_date: "2099-01-01".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let status =
            purge_capsule(AdminOnly(root.clone()), State(state.clone()), Path(capsule.id))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.capsules.list_owned(&alice).unwrap().is_empty());

        let err = purge_capsule(AdminOnly(root), State(state), Path(capsule.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn audit_query_defaults_to_the_clock_day() {
        let (state, root, alice, _temp) = setup();
        audit_log!(state.audit, AuditEventType::LoginSucceeded, alice);

        let Json(today) = query_audit_logs(AdminOnly(root), query(None), State(state))
            .await
            .unwrap();
        assert_eq!(today.total, 1);
        assert_eq!(today.events[0].timestamp.date_naive().to_string(), "2030-05-05");
    }

    #[tokio::test]
    async fn audit_query_filters_by_type() {
        let (state, root, alice, _temp) = setup();
        audit_log!(state.audit, AuditEventType::LoginSucceeded, alice);
        audit_log!(state.audit, AuditEventType::LoggedOut, alice);

        let Json(all) =
            query_audit_logs(AdminOnly(root.clone()), query(None), State(state.clone()))
                .await
                .unwrap();
        assert_eq!(all.total, 2);

        let Json(logouts) =
            query_audit_logs(AdminOnly(root), query(Some("logged_out")), State(state))
                .await
                .unwrap();
        assert_eq!(logouts.total, 1);
        assert_eq!(logouts.events[0].event_type, AuditEventType::LoggedOut);
    }

    #[tokio::test]
    async fn audit_query_rejects_bad_dates() {
        let (state, root, _alice, _temp) = setup();
        let mut params = query(None);
        params.0.start_date = Some("yesterday".to_string());

        let err = query_audit_logs(AdminOnly(root.clone()), params, State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let mut params = query(None);
        params.0.start_date = Some("2030-02-01".to_string());
        params.0.end_date = Some("2030-01-01".to_string());
        let err = query_audit_logs(AdminOnly(root), params, State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
