// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage error type shared by the database, media and audit stores.

use std::io;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Storage directories have not been created yet
    #[error("Storage not initialized")]
    NotInitialized,

    /// Media reference that does not name a file inside the media root
    #[error("Invalid media reference: {0}")]
    InvalidReference(String),

    /// Data read back does not match what was written
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// Password hashing or random generation failure
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
