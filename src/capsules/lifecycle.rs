// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capsule lifecycle service.
//!
//! # Responsibility
//! - Validate creation input before anything is written.
//! - Store attachments through the [`MediaResolver`] and persist the record.
//! - Enforce ownership and the time gate on every read and delete.
//!
//! # Invariants
//! - A non-owner never receives content, attachments or the release date.
//! - Sealed capsules reveal only their name and release day to the owner.
//! - A failed creation persists no capsule; attachments already stored for
//!   it are discarded best-effort.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::gate::{parse_release_date, GateState};
use crate::auth::Actor;
use crate::clock::Clock;
use crate::error::{ServiceError, ValidationError};
use crate::storage::{
    require_admin, Capsule, CapsuleId, CapsuleRepository, MediaReference, MediaResolver,
    NewCapsule, OwnershipEnforcer,
};

/// Longest accepted capsule name.
pub const MAX_NAME_LEN: usize = 200;

/// Longest accepted link.
pub const MAX_LINK_LEN: usize = 2048;

/// An uploaded attachment.
#[derive(Debug, Clone, Default)]
pub struct MediaUpload {
    /// Client-supplied file name; only used to derive a safe key
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Raw creation input, as received from the client.
#[derive(Debug, Clone, Default)]
pub struct CreateCapsule {
    pub name: String,
    pub content: String,
    /// `YYYY-MM-DD`
    pub release_date: String,
    pub link: Option<String>,
    /// Absent or zero-length uploads mean "no photo"
    pub photo: Option<MediaUpload>,
    pub video: Option<MediaUpload>,
}

/// Which attachment of a capsule to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    fn select(self, capsule: &Capsule) -> Option<&MediaReference> {
        match self {
            MediaKind::Photo => capsule.photo.as_ref(),
            MediaKind::Video => capsule.video.as_ref(),
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Outcome of viewing an owned capsule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapsuleView {
    Revealed(Capsule),
    Sealed {
        capsule_id: CapsuleId,
        name: String,
        available_on: chrono::NaiveDate,
    },
}

/// Bytes of an opened attachment.
#[derive(Debug, Clone)]
pub struct OpenedMedia {
    pub reference: MediaReference,
    pub bytes: Vec<u8>,
}

/// Creation input that passed validation.
struct ValidCapsule {
    name: String,
    content: String,
    release_date: chrono::DateTime<chrono::Utc>,
    link: Option<String>,
    photo: Option<MediaUpload>,
    video: Option<MediaUpload>,
}

fn validate(input: CreateCapsule) -> Result<ValidCapsule, ValidationError> {
    if input.name.trim().is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    if input.name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::FieldTooLong {
            field: "name",
            max: MAX_NAME_LEN,
        });
    }
    if input.content.trim().is_empty() {
        return Err(ValidationError::EmptyField("content"));
    }

    let release_date = parse_release_date(&input.release_date)?;
    let link = input.link.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let link = link.map(validate_link).transpose()?;

    Ok(ValidCapsule {
        name: input.name,
        content: input.content,
        release_date,
        link,
        photo: input.photo.filter(|p| !p.bytes.is_empty()),
        video: input.video.filter(|v| !v.bytes.is_empty()),
    })
}

fn validate_link(link: &str) -> Result<String, ValidationError> {
    if link.len() > MAX_LINK_LEN {
        return Err(ValidationError::FieldTooLong {
            field: "link",
            max: MAX_LINK_LEN,
        });
    }
    let parsed = url::Url::parse(link).map_err(|e| ValidationError::InvalidLink(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(link.to_string()),
        other => Err(ValidationError::InvalidLink(format!(
            "unsupported scheme `{other}`"
        ))),
    }
}

pub struct CapsuleService {
    repo: Arc<dyn CapsuleRepository>,
    media: Arc<dyn MediaResolver>,
    clock: Arc<dyn Clock>,
}

impl CapsuleService {
    pub fn new(
        repo: Arc<dyn CapsuleRepository>,
        media: Arc<dyn MediaResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repo, media, clock }
    }

    /// Gate state of a capsule right now.
    pub fn gate(&self, capsule: &Capsule) -> GateState {
        GateState::evaluate(capsule.release_date, self.clock.now())
    }

    /// Create a capsule owned by `actor`.
    pub fn create_capsule(
        &self,
        actor: &Actor,
        input: CreateCapsule,
    ) -> Result<Capsule, ServiceError> {
        let valid = validate(input)?;

        let mut stored = Vec::new();
        let result = self.store_and_persist(actor, valid, &mut stored);
        if let Err(ref e) = result {
            warn!(
                account_id = %actor.account_id,
                error = %e,
                orphaned = stored.len(),
                "Capsule creation failed, discarding stored media"
            );
            for reference in &stored {
                self.discard_media(reference);
            }
        }
        result
    }

    fn store_and_persist(
        &self,
        actor: &Actor,
        valid: ValidCapsule,
        stored: &mut Vec<MediaReference>,
    ) -> Result<Capsule, ServiceError> {
        let photo = self.store_media(valid.photo, stored)?;
        let video = self.store_media(valid.video, stored)?;

        let capsule = self.repo.create(NewCapsule {
            owner_id: actor.account_id,
            name: valid.name,
            content: valid.content,
            link: valid.link,
            photo,
            video,
            release_date: valid.release_date,
            created_at: Some(self.clock.now()),
        })?;

        info!(
            capsule_id = %capsule.id,
            account_id = %actor.account_id,
            release_date = %capsule.release_date.date_naive(),
            "Capsule created"
        );
        Ok(capsule)
    }

    fn store_media(
        &self,
        upload: Option<MediaUpload>,
        stored: &mut Vec<MediaReference>,
    ) -> Result<Option<MediaReference>, ServiceError> {
        let Some(upload) = upload else {
            return Ok(None);
        };
        let reference = self.media.store(&upload.bytes, &upload.file_name)?;
        stored.push(reference.clone());
        Ok(Some(reference))
    }

    fn discard_media(&self, reference: &MediaReference) {
        if let Err(e) = self.media.discard(reference) {
            warn!(media_key = %reference, error = %e, "Failed to discard media");
        }
    }

    /// Capsules owned by `actor`, oldest first.
    pub fn list_owned(&self, actor: &Actor) -> Result<Vec<Capsule>, ServiceError> {
        Ok(self.repo.list_by_owner(actor.account_id)?)
    }

    /// Load a capsule and check that `actor` owns it.
    fn owned(&self, actor: &Actor, id: CapsuleId) -> Result<Capsule, ServiceError> {
        let capsule = self.repo.get_by_id(id)?;
        if let Err(e) = capsule.verify_ownership(actor) {
            warn!(
                capsule_id = %id,
                account_id = %actor.account_id,
                "Access to foreign capsule denied"
            );
            return Err(e);
        }
        Ok(capsule)
    }

    /// View a capsule: the full record once open, otherwise only when it opens.
    pub fn view_capsule(&self, actor: &Actor, id: CapsuleId) -> Result<CapsuleView, ServiceError> {
        let capsule = self.owned(actor, id)?;
        match self.gate(&capsule) {
            GateState::Open => Ok(CapsuleView::Revealed(capsule)),
            GateState::Sealed { available_on } => Ok(CapsuleView::Sealed {
                capsule_id: capsule.id,
                name: capsule.name,
                available_on,
            }),
        }
    }

    /// Read an attachment of an open capsule.
    pub fn open_media(
        &self,
        actor: &Actor,
        id: CapsuleId,
        kind: MediaKind,
    ) -> Result<OpenedMedia, ServiceError> {
        let capsule = self.owned(actor, id)?;
        if let GateState::Sealed { available_on } = self.gate(&capsule) {
            return Err(ServiceError::Sealed { available_on });
        }

        let reference = kind.select(&capsule).cloned().ok_or(ServiceError::NotFound)?;
        let bytes = self.media.resolve(&reference)?;
        debug!(capsule_id = %id, media = %kind, size = bytes.len(), "Media opened");
        Ok(OpenedMedia { reference, bytes })
    }

    /// Delete an owned capsule, sealed or not.
    ///
    /// Ownership is checked against a fresh read, never a caller's copy.
    pub fn delete_capsule(&self, actor: &Actor, id: CapsuleId) -> Result<(), ServiceError> {
        let capsule = self.owned(actor, id)?;
        self.remove(capsule)?;
        info!(capsule_id = %id, account_id = %actor.account_id, "Capsule deleted");
        Ok(())
    }

    /// Administrative delete of any capsule. Returns nothing of its content.
    pub fn purge_capsule(&self, admin: &Actor, id: CapsuleId) -> Result<(), ServiceError> {
        require_admin(admin)?;
        let capsule = self.repo.get_by_id(id)?;
        self.remove(capsule)?;
        info!(capsule_id = %id, admin_id = %admin.account_id, "Capsule purged");
        Ok(())
    }

    fn remove(&self, capsule: Capsule) -> Result<(), ServiceError> {
        self.repo.delete(capsule.id)?;
        for reference in capsule.photo.iter().chain(capsule.video.iter()) {
            self.discard_media(reference);
        }
        Ok(())
    }
}
