// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential store: registration and login verification.

use std::sync::Arc;

use tracing::{info, warn};

use super::{PasswordHasher, Role};
use crate::clock::Clock;
use crate::error::{ServiceError, ValidationError};
use crate::storage::{Account, AccountRepository, NewAccount, StorageError};

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 150;

pub struct CredentialStore {
    accounts: Arc<dyn AccountRepository>,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        hasher: PasswordHasher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            hasher,
            clock,
        }
    }

    /// Create a client account.
    ///
    /// Usernames are compared exactly; `Alice` and `alice` are different
    /// accounts. Only the password verifier is stored. Registration never
    /// grants the admin role, see [`promote_admins`](Self::promote_admins).
    pub fn register(&self, username: &str, password: &str) -> Result<Account, ServiceError> {
        validate_username(username)?;
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password").into());
        }

        let password_hash = self
            .hasher
            .hash(password)
            .map_err(|e| ServiceError::Storage(StorageError::Crypto(e.to_string())))?;

        let account = self
            .accounts
            .insert_account(NewAccount {
                username: username.to_string(),
                password_hash,
                role: Role::Client,
                created_at: self.clock.now(),
            })
            .map_err(|e| match e {
                StorageError::AlreadyExists(_) => ServiceError::DuplicateUsername,
                other => other.into(),
            })?;

        info!(account_id = %account.id, role = %account.role, "Account registered");
        Ok(account)
    }

    /// Grant the admin role to the listed accounts that already exist.
    ///
    /// Run once at startup. A listed name nobody has registered yet stays
    /// unclaimed; whoever registers it later is a plain client until the
    /// next restart promotes them.
    pub fn promote_admins(&self, usernames: &[String]) -> Result<Vec<Account>, ServiceError> {
        let mut promoted = Vec::new();
        for username in usernames {
            match self.accounts.set_account_role(username, Role::Admin)? {
                Some(account) => {
                    info!(
                        account_id = %account.id,
                        username = %account.username,
                        "Admin role granted"
                    );
                    promoted.push(account);
                }
                None => warn!(%username, "Configured admin has no account yet"),
            }
        }
        Ok(promoted)
    }

    /// Verify a login attempt.
    ///
    /// Unknown usernames and wrong passwords both yield
    /// `InvalidCredentials`, and both cost one hash verification.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Account, ServiceError> {
        let Some(account) = self.accounts.account_by_username(username)? else {
            self.hasher.verify_dummy(password);
            return Err(ServiceError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &account.password_hash) {
            warn!(account_id = %account.id, "Password verification failed");
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(account)
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::EmptyField("username"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ValidationError::FieldTooLong {
            field: "username",
            max: MAX_USERNAME_LEN,
        });
    }
    Ok(())
}
