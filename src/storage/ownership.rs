// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for capsule access.
//!
//! Every read or delete of an owned record passes through
//! [`OwnershipEnforcer::verify_ownership`] with the acting [`Actor`]. A
//! failed check yields `Forbidden` and carries nothing from the record.

use crate::auth::{Actor, Role};
use crate::error::ServiceError;

use super::AccountId;

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's account id.
    fn owner_id(&self) -> AccountId;
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the actor owns this resource.
    ///
    /// # Errors
    /// Returns `ServiceError::Forbidden` if the actor doesn't own the resource.
    fn verify_ownership(&self, actor: &Actor) -> Result<(), ServiceError>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, actor: &Actor) -> Result<(), ServiceError> {
        if self.owner_id() == actor.account_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}

/// Administrative operations bypass ownership but require the admin role.
pub fn require_admin(actor: &Actor) -> Result<(), ServiceError> {
    if actor.has_role(Role::Admin) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}
