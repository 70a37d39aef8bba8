// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capsule lifecycle and time-gating core.

pub mod gate;
pub mod lifecycle;

pub use gate::{is_open, parse_release_date, GateState, RELEASE_DATE_FORMAT};
pub use lifecycle::{
    CapsuleService, CapsuleView, CreateCapsule, MediaKind, MediaUpload, OpenedMedia,
};
