// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account records.
//!
//! Usernames are unique by exact match. The stored secret is an encoded
//! password verifier produced by [`PasswordHasher`](crate::auth::PasswordHasher);
//! it is never serialized into API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::storage::StorageResult;

/// Store-assigned account identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account stored in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    /// Encoded password verifier (algorithm, rounds, salt, hash)
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Account fields supplied at registration; the id is assigned on insert.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    pub(crate) fn into_account(self, id: AccountId) -> Account {
        Account {
            id,
            username: self.username,
            password_hash: self.password_hash,
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Persistence contract for accounts.
pub trait AccountRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// The username check and the insert happen atomically.
    ///
    /// # Errors
    /// `StorageError::AlreadyExists` if the username is taken.
    fn insert_account(&self, account: NewAccount) -> StorageResult<Account>;

    /// Look up an account by exact username.
    fn account_by_username(&self, username: &str) -> StorageResult<Option<Account>>;

    /// Change the role of an existing account.
    ///
    /// Returns the updated account, or `None` if no account has this
    /// username.
    fn set_account_role(&self, username: &str, role: Role) -> StorageResult<Option<Account>>;
}
