// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Durable state of the service, all under one data root:
//!
//! ```text
//! $DATA_DIR/
//!   capsules.redb              # accounts, capsules, owner index, sessions
//!   media/<key>                # uploaded photos and videos
//!   audit/<date>/events.jsonl  # daily audit logs
//! ```
//!
//! Services depend on the repository traits ([`AccountRepository`],
//! [`CapsuleRepository`], [`SessionRepository`]) and on [`MediaResolver`],
//! never on a concrete backend. [`Database`] is the production
//! implementation; [`InMemoryStore`] backs unit tests.

pub mod audit;
pub mod database;
pub mod error;
pub mod files;
pub mod media;
pub mod memory;
pub mod ownership;
pub mod paths;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditLog};
pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use files::FileStorage;
pub use media::{FsMediaStore, MediaReference, MediaResolver};
pub use memory::InMemoryStore;
pub use ownership::{require_admin, OwnedResource, OwnershipEnforcer};
pub use paths::StoragePaths;
pub use repository::{
    Account, AccountId, AccountRepository, Capsule, CapsuleId, CapsuleRepository, NewAccount,
    NewCapsule, SessionRecord, SessionRepository,
};
