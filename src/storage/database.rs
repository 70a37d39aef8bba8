// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized Account
//! - `usernames`: username → account_id
//! - `capsules`: capsule_id → serialized Capsule
//! - `owner_index`: (account_id, capsule_id) → ()
//! - `sessions`: session_id → serialized SessionRecord
//! - `counters`: name → last assigned id
//!
//! redb serializes write transactions and lets readers proceed
//! concurrently, which is all the mutual exclusion the services need.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, Table, TableDefinition};

use crate::auth::Role;

use super::repository::{
    Account, AccountId, AccountRepository, Capsule, CapsuleId, CapsuleRepository, NewAccount,
    NewCapsule, SessionRecord, SessionRepository,
};
use super::{StorageError, StorageResult};

// =============================================================================
// Table Definitions
// =============================================================================

const ACCOUNTS: TableDefinition<u64, &[u8]> = TableDefinition::new("accounts");

/// Exact-match username → account id. Enforces uniqueness.
const USERNAMES: TableDefinition<&str, u64> = TableDefinition::new("usernames");

const CAPSULES: TableDefinition<u64, &[u8]> = TableDefinition::new("capsules");

/// Composite key `(owner, capsule)` so one range scan lists an owner's
/// capsules in id (creation) order.
const OWNER_INDEX: TableDefinition<(u64, u64), ()> = TableDefinition::new("owner_index");

const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

const ACCOUNT_COUNTER: &str = "account";
const CAPSULE_COUNTER: &str = "capsule";

/// Bump and return the next id for a counter inside an open write transaction.
fn next_id(counters: &mut Table<'_, &'static str, u64>, name: &str) -> StorageResult<u64> {
    let current = counters.get(name)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    counters.insert(name, next)?;
    Ok(next)
}

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID store for accounts, capsules and sessions.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(USERNAMES)?;
            let _ = write_txn.open_table(CAPSULES)?;
            let _ = write_txn.open_table(OWNER_INDEX)?;
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(COUNTERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Verify a read transaction can be started and the tables opened.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(CAPSULES)?;
        let _ = read_txn.open_table(ACCOUNTS)?;
        Ok(())
    }
}

// =============================================================================
// Accounts
// =============================================================================

impl AccountRepository for Database {
    fn insert_account(&self, account: NewAccount) -> StorageResult<Account> {
        let username = account.username.clone();
        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut usernames = write_txn.open_table(USERNAMES)?;
            let taken = usernames.get(account.username.as_str())?.is_some();
            if taken {
                None
            } else {
                let mut counters = write_txn.open_table(COUNTERS)?;
                let id = AccountId(next_id(&mut counters, ACCOUNT_COUNTER)?);
                let stored = account.into_account(id);
                let json = serde_json::to_vec(&stored)?;

                let mut accounts = write_txn.open_table(ACCOUNTS)?;
                accounts.insert(id.0, json.as_slice())?;
                usernames.insert(stored.username.as_str(), id.0)?;
                Some(stored)
            }
        };

        match stored {
            Some(stored) => {
                write_txn.commit()?;
                Ok(stored)
            }
            None => {
                write_txn.abort()?;
                Err(StorageError::AlreadyExists(format!("Account {username}")))
            }
        }
    }

    fn account_by_username(&self, username: &str) -> StorageResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let usernames = read_txn.open_table(USERNAMES)?;
        let Some(id) = usernames.get(username)?.map(|v| v.value()) else {
            return Ok(None);
        };

        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Err(StorageError::IntegrityViolation(format!(
                "username index points at missing account {id}"
            ))),
        }
    }

    fn set_account_role(&self, username: &str, role: Role) -> StorageResult<Option<Account>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let usernames = write_txn.open_table(USERNAMES)?;
            let Some(id) = usernames.get(username)?.map(|v| v.value()) else {
                return Ok(None);
            };

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account: Account = match accounts.get(id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => {
                    return Err(StorageError::IntegrityViolation(format!(
                        "username index points at missing account {id}"
                    )))
                }
            };
            account.role = role;
            let json = serde_json::to_vec(&account)?;
            accounts.insert(id, json.as_slice())?;
            account
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }
}

// =============================================================================
// Capsules
// =============================================================================

impl CapsuleRepository for Database {
    fn create(&self, capsule: NewCapsule) -> StorageResult<Capsule> {
        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut counters = write_txn.open_table(COUNTERS)?;
            let id = CapsuleId(next_id(&mut counters, CAPSULE_COUNTER)?);
            let stored = capsule.into_capsule(id);
            let json = serde_json::to_vec(&stored)?;

            let mut capsules = write_txn.open_table(CAPSULES)?;
            capsules.insert(id.0, json.as_slice())?;

            let mut index = write_txn.open_table(OWNER_INDEX)?;
            index.insert((stored.owner_id.0, id.0), ())?;
            stored
        };
        write_txn.commit()?;
        Ok(stored)
    }

    fn get_by_id(&self, id: CapsuleId) -> StorageResult<Capsule> {
        let read_txn = self.db.begin_read()?;
        let capsules = read_txn.open_table(CAPSULES)?;
        match capsules.get(id.0)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(format!("Capsule {id}"))),
        }
    }

    fn list_by_owner(&self, owner_id: AccountId) -> StorageResult<Vec<Capsule>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(OWNER_INDEX)?;
        let capsules = read_txn.open_table(CAPSULES)?;

        let mut results = Vec::new();
        for entry in index.range((owner_id.0, 0u64)..=(owner_id.0, u64::MAX))? {
            let (key, _) = entry?;
            let (_, capsule_id) = key.value();
            match capsules.get(capsule_id)? {
                Some(value) => results.push(serde_json::from_slice(value.value())?),
                None => {
                    tracing::warn!(
                        owner_id = %owner_id,
                        capsule_id,
                        "Owner index references a missing capsule"
                    );
                }
            }
        }

        Ok(results)
    }

    fn delete(&self, id: CapsuleId) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut capsules = write_txn.open_table(CAPSULES)?;
            let bytes = capsules.remove(id.0)?.map(|v| v.value().to_vec());
            bytes
        };

        let Some(bytes) = removed else {
            write_txn.abort()?;
            return Err(StorageError::NotFound(format!("Capsule {id}")));
        };

        let capsule: Capsule = serde_json::from_slice(&bytes)?;
        {
            let mut index = write_txn.open_table(OWNER_INDEX)?;
            index.remove((capsule.owner_id.0, id.0))?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Sessions
// =============================================================================

impl SessionRepository for Database {
    fn put_session(&self, session: &SessionRecord) -> StorageResult<()> {
        let json = serde_json::to_vec(session)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            table.insert(session.session_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn session(&self, session_id: &str) -> StorageResult<Option<SessionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        match table.get(session_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn remove_session(&self, session_id: &str) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(SESSIONS)?;
            let removed = table.remove(session_id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(SESSIONS)?;

            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let session: SessionRecord = serde_json::from_slice(value.value())?;
                if session.is_expired_at(now) {
                    expired.push(key.value().to_string());
                }
            }

            for session_id in &expired {
                table.remove(session_id.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(purged)
    }
}

// =============================================================================
// Tests
// =============================================================================
