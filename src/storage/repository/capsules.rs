// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capsule records.
//!
//! A capsule is immutable once created; the only mutation is deletion.
//! Whether it is open or sealed is never stored, see
//! [`crate::capsules::gate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AccountId;
use crate::storage::{MediaReference, OwnedResource, StorageResult};

/// Repository-assigned capsule identifier. Never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct CapsuleId(pub u64);

impl std::fmt::Display for CapsuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capsule as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capsule {
    pub id: CapsuleId,
    pub owner_id: AccountId,
    /// Display name
    pub name: String,
    pub content: String,
    pub link: Option<String>,
    pub photo: Option<MediaReference>,
    pub video: Option<MediaReference>,
    /// Instant at which the capsule opens (midnight UTC of the release day)
    pub release_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OwnedResource for Capsule {
    fn owner_id(&self) -> AccountId {
        self.owner_id
    }
}

/// Capsule fields supplied on creation; the repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCapsule {
    pub owner_id: AccountId,
    pub name: String,
    pub content: String,
    pub link: Option<String>,
    pub photo: Option<MediaReference>,
    pub video: Option<MediaReference>,
    pub release_date: DateTime<Utc>,
    /// Filled with the current time on insert when `None`
    pub created_at: Option<DateTime<Utc>>,
}

impl NewCapsule {
    pub(crate) fn into_capsule(self, id: CapsuleId) -> Capsule {
        Capsule {
            id,
            owner_id: self.owner_id,
            name: self.name,
            content: self.content,
            link: self.link,
            photo: self.photo,
            video: self.video,
            release_date: self.release_date,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Persistence contract for capsules.
///
/// Every operation is atomic with respect to a single record.
pub trait CapsuleRepository: Send + Sync {
    /// Persist a new capsule and return it with its assigned id.
    fn create(&self, capsule: NewCapsule) -> StorageResult<Capsule>;

    /// # Errors
    /// `StorageError::NotFound` if no capsule has this id.
    fn get_by_id(&self, id: CapsuleId) -> StorageResult<Capsule>;

    /// All capsules of one owner, in creation order.
    fn list_by_owner(&self, owner_id: AccountId) -> StorageResult<Vec<Capsule>>;

    /// # Errors
    /// `StorageError::NotFound` if no capsule has this id.
    fn delete(&self, id: CapsuleId) -> StorageResult<()>;
}
