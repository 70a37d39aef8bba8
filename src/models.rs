// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive
//! `Serialize` and/or `Deserialize` plus `ToSchema` for OpenAPI docs.
//!
//! ## Model Categories
//!
//! - **Accounts**: registration, login and the current identity
//! - **Capsules**: summaries, revealed and sealed views
//! - **Admin**: audit log queries

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{Actor, IssuedSession, Role};
use crate::capsules::{CapsuleView, GateState};
use crate::storage::{AccountId, AuditEvent, Capsule, CapsuleId};

// =============================================================================
// Account Models
// =============================================================================

/// Username and password, for both registration and login.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// The authenticated account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AccountResponse {
    pub account_id: AccountId,
    pub username: String,
    pub role: Role,
}

impl From<&Actor> for AccountResponse {
    fn from(actor: &Actor) -> Self {
        Self {
            account_id: actor.account_id,
            username: actor.username.clone(),
            role: actor.role,
        }
    }
}

/// A freshly opened session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    /// Always `Bearer`
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub account: AccountResponse,
}

impl From<IssuedSession> for SessionResponse {
    fn from(session: IssuedSession) -> Self {
        Self {
            account: AccountResponse::from(&session.actor),
            token: session.token,
            token_type: "Bearer".to_string(),
            expires_at: session.expires_at,
        }
    }
}

// =============================================================================
// Capsule Models
// =============================================================================

fn media_url(id: CapsuleId, kind: &str) -> String {
    format!("/v1/capsules/{id}/{kind}")
}

/// Multipart form accepted by `POST /v1/capsules`. Documentation only;
/// the handler reads the fields from the multipart stream.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreateCapsuleForm {
    pub name: String,
    pub content: String,
    /// `YYYY-MM-DD`; the capsule opens at midnight UTC of this day
    pub release_date: String,
    pub link: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub photo: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub video: Option<Vec<u8>>,
}

/// Full capsule, returned only to its owner once open (and on creation).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CapsuleDetail {
    pub id: CapsuleId,
    pub name: String,
    pub content: String,
    pub link: Option<String>,
    /// Download path of the photo, if any
    pub photo_url: Option<String>,
    /// Download path of the video, if any
    pub video_url: Option<String>,
    pub release_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<Capsule> for CapsuleDetail {
    fn from(capsule: Capsule) -> Self {
        Self {
            photo_url: capsule.photo.as_ref().map(|_| media_url(capsule.id, "photo")),
            video_url: capsule.video.as_ref().map(|_| media_url(capsule.id, "video")),
            id: capsule.id,
            name: capsule.name,
            content: capsule.content,
            link: capsule.link,
            release_date: capsule.release_date.date_naive(),
            created_at: capsule.created_at,
        }
    }
}

/// Result of viewing a capsule.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CapsuleViewResponse {
    Open {
        capsule: CapsuleDetail,
    },
    Sealed {
        id: CapsuleId,
        name: String,
        available_on: NaiveDate,
    },
}

impl From<CapsuleView> for CapsuleViewResponse {
    fn from(view: CapsuleView) -> Self {
        match view {
            CapsuleView::Revealed(capsule) => CapsuleViewResponse::Open {
                capsule: capsule.into(),
            },
            CapsuleView::Sealed {
                capsule_id,
                name,
                available_on,
            } => CapsuleViewResponse::Sealed {
                id: capsule_id,
                name,
                available_on,
            },
        }
    }
}

/// Dashboard row. Content and attachments appear only once open.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CapsuleSummary {
    pub id: CapsuleId,
    pub name: String,
    pub release_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub is_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub has_photo: bool,
    pub has_video: bool,
}

impl CapsuleSummary {
    pub fn new(capsule: Capsule, gate: GateState) -> Self {
        let is_open = gate.is_open();
        Self {
            id: capsule.id,
            release_date: capsule.release_date.date_naive(),
            created_at: capsule.created_at,
            is_open,
            content: is_open.then_some(capsule.content),
            link: if is_open { capsule.link } else { None },
            has_photo: capsule.photo.is_some(),
            has_video: capsule.video.is_some(),
            name: capsule.name,
        }
    }
}

// =============================================================================
// Admin Models
// =============================================================================

/// Query parameters for audit log queries.
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct AuditQueryParams {
    /// First day (YYYY-MM-DD), defaults to today
    pub start_date: Option<String>,
    /// Last day (YYYY-MM-DD), defaults to `start_date`
    pub end_date: Option<String>,
    /// Filter by acting account id
    pub account_id: Option<String>,
    /// Filter by event type (snake_case)
    pub event_type: Option<String>,
    /// Maximum number of events (default 100, max 1000)
    pub limit: Option<usize>,
}

/// Response for audit log queries.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub events: Vec<AuditEvent>,
    /// Matching events before the limit was applied
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MediaResolver;
    use chrono::TimeZone;

    fn capsule() -> Capsule {
        Capsule {
            id: CapsuleId(5),
            owner_id: AccountId(1),
            name: "B1".to_string(),
            content: "hello".to_string(),
            link: Some("https://example.com".to_string()),
            photo: None,
            video: None,
            release_date: Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn sealed_summary_hides_content() {
        let sealed = GateState::Sealed {
            available_on: NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
        };
        let summary = CapsuleSummary::new(capsule(), sealed);
        assert!(!summary.is_open);
        assert!(summary.content.is_none());
        assert!(summary.link.is_none());

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["release_date"], "2030-01-02");
    }

    #[test]
    fn open_summary_includes_content() {
        let summary = CapsuleSummary::new(capsule(), GateState::Open);
        assert_eq!(summary.content.as_deref(), Some("hello"));
    }

    #[test]
    fn detail_links_media_by_capsule_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = crate::storage::StoragePaths::new(temp.path());
        let mut files = crate::storage::FileStorage::new(paths);
        files.initialize().unwrap();
        let media = crate::storage::FsMediaStore::new(std::sync::Arc::new(files));

        let mut with_photo = capsule();
        with_photo.photo = Some(media.store(b"x", "a.png").unwrap());

        let detail = CapsuleDetail::from(with_photo);
        assert_eq!(detail.photo_url.as_deref(), Some("/v1/capsules/5/photo"));
        assert!(detail.video_url.is_none());
    }

    #[test]
    fn view_response_is_tagged_by_status() {
        let sealed = CapsuleViewResponse::from(CapsuleView::Sealed {
            capsule_id: CapsuleId(5),
            name: "B1".to_string(),
            available_on: NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
        });
        let json = serde_json::to_value(&sealed).unwrap();
        assert_eq!(json["status"], "sealed");
        assert_eq!(json["available_on"], "2030-01-02");
        assert!(json.get("content").is_none());

        let open = CapsuleViewResponse::from(CapsuleView::Revealed(capsule()));
        let json = serde_json::to_value(&open).unwrap();
        assert_eq!(json["status"], "open");
        assert_eq!(json["capsule"]["content"], "hello");
    }
}
