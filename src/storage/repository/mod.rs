// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer: stored record types and the traits the services
//! depend on.
//!
//! Each repository trait is implemented by the redb-backed
//! [`Database`](super::Database) and by the [`InMemoryStore`](super::InMemoryStore)
//! used in tests.

pub mod accounts;
pub mod capsules;
pub mod sessions;

pub use accounts::{Account, AccountId, AccountRepository, NewAccount};
pub use capsules::{Capsule, CapsuleId, CapsuleRepository, NewCapsule};
pub use sessions::{SessionRecord, SessionRepository};
