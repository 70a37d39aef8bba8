// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory repository for tests and throwaway instances.
//!
//! Implements the same contracts as the redb [`Database`](super::Database)
//! behind a single `RwLock`, so each call is atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::auth::Role;

use super::{
    Account, AccountId, AccountRepository, Capsule, CapsuleId, CapsuleRepository, NewAccount,
    NewCapsule, SessionRecord, SessionRepository, StorageError, StorageResult,
};

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    usernames: HashMap<String, AccountId>,
    capsules: BTreeMap<CapsuleId, Capsule>,
    sessions: HashMap<String, SessionRecord>,
    next_account: u64,
    next_capsule: u64,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    fail_capsule_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent capsule `create` fail with a storage error.
    pub fn fail_capsule_writes(&self, fail: bool) {
        self.fail_capsule_writes.store(fail, Ordering::SeqCst);
    }

    pub fn account_count(&self) -> usize {
        self.read().accounts.len()
    }

    pub fn capsule_count(&self) -> usize {
        self.read().capsules.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl AccountRepository for InMemoryStore {
    fn insert_account(&self, account: NewAccount) -> StorageResult<Account> {
        let mut tables = self.write();
        if tables.usernames.contains_key(&account.username) {
            return Err(StorageError::AlreadyExists(format!(
                "Account {}",
                account.username
            )));
        }

        tables.next_account += 1;
        let stored = account.into_account(AccountId(tables.next_account));
        tables.usernames.insert(stored.username.clone(), stored.id);
        tables.accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn account_by_username(&self, username: &str) -> StorageResult<Option<Account>> {
        let tables = self.read();
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    fn set_account_role(&self, username: &str, role: Role) -> StorageResult<Option<Account>> {
        let mut tables = self.write();
        let Some(id) = tables.usernames.get(username).copied() else {
            return Ok(None);
        };
        Ok(tables.accounts.get_mut(&id).map(|account| {
            account.role = role;
            account.clone()
        }))
    }
}

impl CapsuleRepository for InMemoryStore {
    fn create(&self, capsule: NewCapsule) -> StorageResult<Capsule> {
        if self.fail_capsule_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other(
                "capsule writes disabled",
            )));
        }

        let mut tables = self.write();
        tables.next_capsule += 1;
        let stored = capsule.into_capsule(CapsuleId(tables.next_capsule));
        tables.capsules.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn get_by_id(&self, id: CapsuleId) -> StorageResult<Capsule> {
        self.read()
            .capsules
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("Capsule {id}")))
    }

    fn list_by_owner(&self, owner_id: AccountId) -> StorageResult<Vec<Capsule>> {
        Ok(self
            .read()
            .capsules
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn delete(&self, id: CapsuleId) -> StorageResult<()> {
        self.write()
            .capsules
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("Capsule {id}")))
    }
}

impl SessionRepository for InMemoryStore {
    fn put_session(&self, session: &SessionRecord) -> StorageResult<()> {
        self.write()
            .sessions
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    fn session(&self, session_id: &str) -> StorageResult<Option<SessionRecord>> {
        Ok(self.read().sessions.get(session_id).cloned())
    }

    fn remove_session(&self, session_id: &str) -> StorageResult<bool> {
        Ok(self.write().sessions.remove(session_id).is_some())
    }

    fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let mut tables = self.write();
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok(before - tables.sessions.len())
    }
}
