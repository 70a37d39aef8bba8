// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session issuance, verification and revocation.
//!
//! A session is a server-side [`SessionRecord`] plus an HS256 bearer token
//! that names it. The token alone is not enough: a request authenticates
//! only while the record it points at still exists, so logout takes effect
//! immediately.
//!
//! Expiry is checked against the injected [`Clock`] rather than the system
//! time, which is why `jsonwebtoken`'s own `exp` validation is disabled.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Actor, AuthError, SessionClaims};
use crate::clock::Clock;
use crate::error::ServiceError;
use crate::storage::{Account, SessionRecord, SessionRepository, StorageError};

/// Default session lifetime (24 hours).
pub const DEFAULT_SESSION_TTL: Duration = Duration::hours(24);

/// Issuer written into and required from every token.
pub const TOKEN_ISSUER: &str = "time-capsule";

/// Interval between expired-session sweeps.
const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(600);

/// Who is making the current request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionContext {
    #[default]
    Anonymous,
    Authenticated(Actor),
}

impl SessionContext {
    /// The actor, or `Unauthenticated` for an anonymous context.
    pub fn require(self) -> Result<Actor, ServiceError> {
        match self {
            SessionContext::Authenticated(actor) => Ok(actor),
            SessionContext::Anonymous => Err(ServiceError::Unauthenticated),
        }
    }

    pub fn actor(&self) -> Option<&Actor> {
        match self {
            SessionContext::Authenticated(actor) => Some(actor),
            SessionContext::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionContext::Authenticated(_))
    }
}

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub actor: Actor,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionManager {
    store: Arc<dyn SessionRepository>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionRepository>,
        secret: &[u8],
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            clock,
        }
    }

    /// Open a new session for `account` and mint its bearer token.
    pub fn establish(&self, account: &Account) -> Result<IssuedSession, ServiceError> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.ttl;

        let record = SessionRecord {
            session_id: uuid::Uuid::new_v4().to_string(),
            account_id: account.id,
            username: account.username.clone(),
            role: account.role,
            issued_at,
            expires_at,
        };

        let claims = SessionClaims {
            sub: account.id.to_string(),
            sid: record.session_id.clone(),
            username: record.username.clone(),
            role: record.role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Storage(StorageError::Crypto(e.to_string())))?;

        self.store.put_session(&record)?;

        debug!(
            account_id = %account.id,
            session_id = %record.session_id,
            "Session established"
        );

        Ok(IssuedSession {
            token,
            actor: Actor::from_session(&record),
            expires_at,
        })
    }

    /// Verify a bearer token and resolve it to the acting account.
    pub fn authenticate_token(&self, token: &str) -> Result<Actor, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[TOKEN_ISSUER]);

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                _ => AuthError::MalformedToken,
            })?
            .claims;

        let now = self.clock.now();
        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }

        let record = self
            .store
            .session(&claims.sid)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .ok_or(AuthError::SessionRevoked)?;

        if record.account_id.to_string() != claims.sub {
            warn!(session_id = %claims.sid, "Token subject does not match session owner");
            return Err(AuthError::SessionRevoked);
        }
        if record.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        Ok(Actor::from_session(&record))
    }

    /// Resolve an optional bearer token into a context; any failure is
    /// treated as anonymous.
    pub fn context_for(&self, token: Option<&str>) -> SessionContext {
        match token.map(|t| self.authenticate_token(t)) {
            Some(Ok(actor)) => SessionContext::Authenticated(actor),
            _ => SessionContext::Anonymous,
        }
    }

    /// End the session behind `context`.
    ///
    /// Always lands in `Anonymous`, including when the session was already
    /// revoked or the context was never authenticated.
    pub fn logout(&self, context: SessionContext) -> Result<SessionContext, ServiceError> {
        if let Some(session_id) = context.actor().and_then(|a| a.session_id.as_deref()) {
            let removed = self.store.remove_session(session_id)?;
            debug!(session_id = %session_id, removed, "Session revoked");
        }
        Ok(SessionContext::Anonymous)
    }

    /// Delete every session that has expired by now.
    pub fn purge_expired(&self) -> Result<usize, ServiceError> {
        Ok(self.store.purge_expired_sessions(self.clock.now())?)
    }
}

/// Background task that periodically drops expired session records.
pub struct SessionSweeper {
    sessions: Arc<SessionManager>,
    interval: StdDuration,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            interval: SWEEP_INTERVAL,
        }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(SessionSweeper::new(sessions).run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Session sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Session sweeper shutting down");
                return;
            }

            match self.sessions.purge_expired() {
                Ok(0) => {}
                Ok(count) => info!(count, "Purged expired sessions"),
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    return;
                }
            }
        }
    }
}
