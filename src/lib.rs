// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Time Capsule - Time-gated capsule storage service
//!
//! Accounts store capsules (text, an optional link and optional photo/video
//! attachments) that stay sealed until their release date. Only the owner
//! can ever read a capsule, and only once it is open.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Accounts, password hashing, bearer sessions
//! - `capsules` - Capsule lifecycle and the time gate
//! - `storage` - redb database, media files and the audit log

pub mod api;
pub mod auth;
pub mod capsules;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
