// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use ring::rand::{SecureRandom, SystemRandom};

use crate::auth::password::PasswordError;
use crate::auth::{CredentialStore, PasswordHasher, SessionManager};
use crate::capsules::CapsuleService;
use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::error::ServiceError;
use crate::storage::{AuditLog, Database, FileStorage, FsMediaStore, StorageError, StoragePaths};

const GENERATED_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Failed to apply admin roles: {0}")]
    Admins(#[from] ServiceError),
}

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialStore>,
    pub sessions: Arc<SessionManager>,
    pub capsules: Arc<CapsuleService>,
    pub audit: Arc<AuditLog>,
    pub files: Arc<FileStorage>,
    pub database: Arc<Database>,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn open(config: &ServerConfig) -> Result<Self, StateError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build the state with an explicit clock (tests drive time with this).
    pub fn with_clock(config: &ServerConfig, clock: Arc<dyn Clock>) -> Result<Self, StateError> {
        let mut files = FileStorage::new(StoragePaths::new(&config.data_dir));
        files.initialize()?;
        let files = Arc::new(files);

        let database = Arc::new(Database::open(&files.paths().database_file())?);

        let secret = match &config.session_secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                tracing::warn!("SESSION_SECRET not set, sessions will not survive a restart");
                let mut secret = vec![0u8; GENERATED_SECRET_LEN];
                SystemRandom::new()
                    .fill(&mut secret)
                    .map_err(|_| PasswordError::Rng)?;
                secret
            }
        };

        let credentials = CredentialStore::new(
            database.clone(),
            PasswordHasher::new(config.password_hash_iterations)?,
            clock.clone(),
        );
        credentials.promote_admins(&config.admin_usernames)?;

        let sessions =
            SessionManager::new(database.clone(), &secret, config.session_ttl, clock.clone());

        let capsules = CapsuleService::new(
            database.clone(),
            Arc::new(FsMediaStore::new(files.clone())),
            clock.clone(),
        );

        Ok(Self {
            credentials: Arc::new(credentials),
            sessions: Arc::new(sessions),
            capsules: Arc::new(capsules),
            audit: Arc::new(AuditLog::new(files.clone(), clock)),
            files,
            database,
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}
