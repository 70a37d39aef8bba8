// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{Actor, Role},
    capsules::GateState,
    models::{
        AccountResponse, AuditLogResponse, AuditQueryParams, CapsuleDetail, CapsuleSummary,
        CapsuleViewResponse, CreateCapsuleForm, CredentialsRequest, SessionResponse,
    },
    state::AppState,
    storage::{AccountId, AuditEvent, AuditEventType, CapsuleId},
};

pub mod accounts;
pub mod admin;
pub mod capsules;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    let v1_routes = Router::new()
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/auth/logout", post(accounts::logout))
        .route("/users/me", get(users::get_current_user))
        .route(
            "/capsules",
            get(capsules::list_capsules).post(capsules::create_capsule),
        )
        .route(
            "/capsules/{capsule_id}",
            get(capsules::get_capsule).delete(capsules::delete_capsule),
        )
        .route("/capsules/{capsule_id}/photo", get(capsules::get_photo))
        .route("/capsules/{capsule_id}/video", get(capsules::get_video))
        .route(
            "/admin/capsules/{capsule_id}",
            delete(admin::purge_capsule),
        )
        .route("/admin/audit/events", get(admin::query_audit_logs))
        .layer(DefaultBodyLimit::max(body_limit));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

/// Registers the `bearer` security scheme referenced by the handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        accounts::register,
        accounts::login,
        accounts::logout,
        users::get_current_user,
        capsules::create_capsule,
        capsules::list_capsules,
        capsules::get_capsule,
        capsules::get_photo,
        capsules::get_video,
        capsules::delete_capsule,
        admin::purge_capsule,
        admin::query_audit_logs
    ),
    components(
        schemas(
            AccountId,
            CapsuleId,
            Role,
            Actor,
            GateState,
            CredentialsRequest,
            AccountResponse,
            SessionResponse,
            CreateCapsuleForm,
            CapsuleDetail,
            CapsuleSummary,
            CapsuleViewResponse,
            AuditQueryParams,
            AuditLogResponse,
            AuditEvent,
            AuditEventType,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Registration and sessions"),
        (name = "Users", description = "Current account"),
        (name = "Capsules", description = "Time-gated capsules"),
        (name = "Admin", description = "Administrative operations")
    )
)]
struct ApiDoc;
