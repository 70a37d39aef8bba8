// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the authenticated actor.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::{Account, AccountId, SessionRecord};

/// Claims carried by a session bearer token (HS256 JWT).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject: the account id, as a string
    pub sub: String,
    /// Server-side session id; revoked on logout
    pub sid: String,
    pub username: String,
    pub role: Role,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    pub iss: String,
}

/// The account on whose behalf an operation runs.
///
/// Every capsule operation takes an `&Actor`; holding one is the proof
/// that the request is authenticated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Actor {
    pub account_id: AccountId,
    pub username: String,
    pub role: Role,

    /// Session the request was authenticated with (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Actor {
    /// Actor for an account without an attached session.
    pub fn from_account(account: &Account) -> Self {
        Self {
            account_id: account.id,
            username: account.username.clone(),
            role: account.role,
            session_id: None,
        }
    }

    pub fn from_session(session: &SessionRecord) -> Self {
        Self {
            account_id: session.account_id,
            username: session.username.clone(),
            role: session.role,
            session_id: Some(session.session_id.clone()),
        }
    }

    /// Check if the actor has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(role: Role) -> Account {
        Account {
            id: AccountId(42),
            username: "alice".to_string(),
            password_hash: "x".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn from_account_copies_identity() {
        let actor = Actor::from_account(&account(Role::Client));
        assert_eq!(actor.account_id, AccountId(42));
        assert_eq!(actor.username, "alice");
        assert!(actor.session_id.is_none());
        assert!(!actor.is_admin());
    }

    #[test]
    fn has_role_checks_privilege() {
        let admin = Actor::from_account(&account(Role::Admin));
        assert!(admin.has_role(Role::Admin));
        assert!(admin.has_role(Role::Client));

        let client = Actor::from_account(&account(Role::Client));
        assert!(!client.has_role(Role::Admin));
    }

    #[test]
    fn serialization_hides_missing_session() {
        let actor = Actor::from_account(&account(Role::Client));
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["account_id"], 42);
        assert_eq!(json["role"], "client");
        assert!(json.get("session_id").is_none());
    }
}
