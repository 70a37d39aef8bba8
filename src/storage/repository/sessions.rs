// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side session records.
//!
//! A bearer token is only honoured while its session record exists, which
//! is what makes logout effective before the token expires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountId;
use crate::auth::Role;
use crate::storage::StorageResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub account_id: AccountId,
    pub username: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Persistence contract for sessions.
pub trait SessionRepository: Send + Sync {
    fn put_session(&self, session: &SessionRecord) -> StorageResult<()>;

    fn session(&self, session_id: &str) -> StorageResult<Option<SessionRecord>>;

    /// Returns whether a record was removed.
    fn remove_session(&self, session_id: &str) -> StorageResult<bool>;

    /// Drop every session expired at `now`; returns how many were removed.
    fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StorageResult<usize>;
}
