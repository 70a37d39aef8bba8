// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Accounts, sessions and the acting identity for each request.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in with username + password
//! 2. [`CredentialStore`] verifies the password (PBKDF2, constant time)
//! 3. [`SessionManager`] stores a session record and returns an HS256 token
//! 4. Client sends `Authorization: Bearer <token>`
//! 5. The [`Auth`] extractor verifies the token, checks that its session
//!    still exists, and hands the handler an [`Actor`]
//!
//! ## Security
//!
//! - All capsule endpoints require authentication
//! - Logout deletes the session record, so the token stops working at once
//! - Unknown usernames and wrong passwords are indistinguishable

pub mod actor;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod password;
pub mod roles;
pub mod session;

pub use actor::{Actor, SessionClaims};
pub use credentials::CredentialStore;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, OptionalAuth};
pub use password::PasswordHasher;
pub use roles::Role;
pub use session::{IssuedSession, SessionContext, SessionManager, SessionSweeper};
