// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capsule endpoints.
//!
//! Every route here is owner-scoped: an account only ever reaches its own
//! capsules, and content stays hidden until the release date has passed.

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    auth::{Actor, Auth},
    capsules::{CapsuleView, CreateCapsule, MediaKind, MediaUpload},
    error::{ApiError, ServiceError},
    models::{CapsuleDetail, CapsuleSummary, CapsuleViewResponse, CreateCapsuleForm},
    state::AppState,
    storage::{AuditEvent, AuditEventType, CapsuleId},
};

/// Convert a service result, recording denied access to a foreign capsule.
fn audited<T>(
    state: &AppState,
    actor: &Actor,
    capsule_id: CapsuleId,
    result: Result<T, ServiceError>,
) -> Result<T, ApiError> {
    if let Err(ServiceError::Forbidden) = &result {
        state.audit.record(
            AuditEvent::new(AuditEventType::PermissionDenied)
                .with_account(actor.account_id)
                .with_resource("capsule", capsule_id)
                .failed("not the owner"),
        );
    }
    result.map_err(ApiError::from)
}

async fn field_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))
}

async fn field_upload(field: Field<'_>) -> Result<MediaUpload, ApiError> {
    let file_name = field
        .file_name()
        .or(field.name())
        .unwrap_or_default()
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
    Ok(MediaUpload::new(file_name, bytes.to_vec()))
}

/// Collect the creation form out of a multipart body.
async fn read_form(mut multipart: Multipart) -> Result<CreateCapsule, ApiError> {
    let mut input = CreateCapsule::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("name") => input.name = field_text(field).await?,
            Some("content") => input.content = field_text(field).await?,
            Some("release_date") => input.release_date = field_text(field).await?,
            Some("link") => input.link = Some(field_text(field).await?),
            Some("photo") => input.photo = Some(field_upload(field).await?),
            Some("video") => input.video = Some(field_upload(field).await?),
            other => tracing::debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    Ok(input)
}

/// Create a capsule.
///
/// Accepts `multipart/form-data` with `name`, `content`, `release_date`
/// (`YYYY-MM-DD`), an optional `link` and optional `photo`/`video` files.
#[utoipa::path(
    post,
    path = "/v1/capsules",
    tag = "Capsules",
    security(("bearer" = [])),
    request_body(content = CreateCapsuleForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Capsule created", body = CapsuleDetail),
        (status = 400, description = "Malformed multipart body"),
        (status = 401, description = "Not authenticated"),
        (status = 413, description = "Upload too large"),
        (status = 422, description = "Validation failed"),
    )
)]
pub async fn create_capsule(
    Auth(actor): Auth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CapsuleDetail>), ApiError> {
    let input = read_form(multipart).await?;
    let capsule = state.capsules.create_capsule(&actor, input)?;

    crate::audit_log!(state.audit, AuditEventType::CapsuleCreated, actor, "capsule", capsule.id);
    Ok((StatusCode::CREATED, Json(capsule.into())))
}

/// List the caller's capsules, oldest first.
///
/// Sealed capsules are listed without their content.
#[utoipa::path(
    get,
    path = "/v1/capsules",
    tag = "Capsules",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Owned capsules", body = Vec<CapsuleSummary>),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn list_capsules(
    Auth(actor): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<CapsuleSummary>>, ApiError> {
    let capsules = state.capsules.list_owned(&actor)?;
    let summaries = capsules
        .into_iter()
        .map(|capsule| {
            let gate = state.capsules.gate(&capsule);
            CapsuleSummary::new(capsule, gate)
        })
        .collect();
    Ok(Json(summaries))
}

/// View a capsule.
///
/// Returns the full capsule once open, otherwise its name and opening day.
#[utoipa::path(
    get,
    path = "/v1/capsules/{capsule_id}",
    tag = "Capsules",
    security(("bearer" = [])),
    params(("capsule_id" = u64, Path, description = "Capsule id")),
    responses(
        (status = 200, description = "Open or sealed capsule", body = CapsuleViewResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such capsule"),
    )
)]
pub async fn get_capsule(
    Auth(actor): Auth,
    State(state): State<AppState>,
    Path(capsule_id): Path<CapsuleId>,
) -> Result<Json<CapsuleViewResponse>, ApiError> {
    let result = state.capsules.view_capsule(&actor, capsule_id);
    let view = audited(&state, &actor, capsule_id, result)?;

    if matches!(view, CapsuleView::Revealed(_)) {
        crate::audit_log!(state.audit, AuditEventType::CapsuleViewed, actor, "capsule", capsule_id);
    }
    Ok(Json(view.into()))
}

fn media_response(
    state: &AppState,
    actor: &Actor,
    capsule_id: CapsuleId,
    kind: MediaKind,
) -> Result<Response, ApiError> {
    let result = state.capsules.open_media(actor, capsule_id, kind);
    let media = audited(state, actor, capsule_id, result)?;
    Ok(([(header::CONTENT_TYPE, media.reference.content_type())], media.bytes).into_response())
}

/// Download the photo of an open capsule.
#[utoipa::path(
    get,
    path = "/v1/capsules/{capsule_id}/photo",
    tag = "Capsules",
    security(("bearer" = [])),
    params(("capsule_id" = u64, Path, description = "Capsule id")),
    responses(
        (status = 200, description = "Photo bytes with its media type"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such capsule or no photo"),
        (status = 423, description = "Capsule is still sealed"),
    )
)]
pub async fn get_photo(
    Auth(actor): Auth,
    State(state): State<AppState>,
    Path(capsule_id): Path<CapsuleId>,
) -> Result<Response, ApiError> {
    media_response(&state, &actor, capsule_id, MediaKind::Photo)
}

/// Download the video of an open capsule.
#[utoipa::path(
    get,
    path = "/v1/capsules/{capsule_id}/video",
    tag = "Capsules",
    security(("bearer" = [])),
    params(("capsule_id" = u64, Path, description = "Capsule id")),
    responses(
        (status = 200, description = "Video bytes with its media type"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such capsule or no video"),
        (status = 423, description = "Capsule is still sealed"),
    )
)]
pub async fn get_video(
    Auth(actor): Auth,
    State(state): State<AppState>,
    Path(capsule_id): Path<CapsuleId>,
) -> Result<Response, ApiError> {
    media_response(&state, &actor, capsule_id, MediaKind::Video)
}

/// Delete an owned capsule, sealed or open.
#[utoipa::path(
    delete,
    path = "/v1/capsules/{capsule_id}",
    tag = "Capsules",
    security(("bearer" = [])),
    params(("capsule_id" = u64, Path, description = "Capsule id")),
    responses(
        (status = 204, description = "Capsule deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such capsule"),
    )
)]
pub async fn delete_capsule(
    Auth(actor): Auth,
    State(state): State<AppState>,
    Path(capsule_id): Path<CapsuleId>,
) -> Result<StatusCode, ApiError> {
    audited(&state, &actor, capsule_id, state.capsules.delete_capsule(&actor, capsule_id))?;

    crate::audit_log!(state.audit, AuditEventType::CapsuleDeleted, actor, "capsule", capsule_id);
    Ok(StatusCode::NO_CONTENT)
}
