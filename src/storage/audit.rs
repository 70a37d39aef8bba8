// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Account, session and capsule events are appended to a daily JSONL file
//! under `audit/<date>/events.jsonl`. Audit writes never fail the request
//! that triggered them; a failed write is logged and dropped.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{FileStorage, StorageError, StorageResult};
use crate::clock::Clock;

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Account events
    AccountRegistered,

    // Session events
    LoginSucceeded,
    LoginFailed,
    LoggedOut,

    // Capsule events
    CapsuleCreated,
    CapsuleViewed,
    CapsuleDeleted,
    CapsulePurged,

    PermissionDenied,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Account that triggered the event (if known).
    pub account_id: Option<String>,
    /// Resource affected (capsule id, account id).
    pub resource_id: Option<String>,
    /// Resource type (capsule, account).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            account_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_account(mut self, account_id: impl ToString) -> Self {
        self.account_id = Some(account_id.to_string());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl ToString,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Append-only audit log.
///
/// Events passed to [`record`](Self::record) are stamped with the
/// service clock, so they land in the same day the clock reports.
pub struct AuditLog {
    storage: Arc<FileStorage>,
    clock: Arc<dyn Clock>,
}

impl AuditLog {
    pub fn new(storage: Arc<FileStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Current day according to the service clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Append an event to its day's log.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.storage.paths().audit_events_file(&date);
        let line = serde_json::to_string(event)?;
        self.storage.append_line(path, &line)
    }

    /// Stamp and record an event, logging (not returning) any write failure.
    pub fn record(&self, mut event: AuditEvent) {
        event.timestamp = self.clock.now();
        if let Err(e) = self.log(&event) {
            tracing::warn!(
                error = %e,
                event_type = ?event.event_type,
                "Failed to write audit event"
            );
        }
    }

    /// Read audit events for a specific date (`YYYY-MM-DD`).
    ///
    /// A day without events yields an empty list.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let path = self.storage.paths().audit_events_file(date);
        let content = match self.storage.read_raw(&path) {
            Ok(content) => content,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let text = String::from_utf8(content).map_err(|e| {
            StorageError::IntegrityViolation(format!("Invalid UTF-8 in audit log: {e}"))
        })?;

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StorageError::from))
            .collect()
    }

    /// Read events for an inclusive date range.
    pub fn read_events_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<AuditEvent>> {
        let mut all_events = Vec::new();
        let mut current = start;

        while current <= end {
            all_events.extend(self.read_events(&current.format("%Y-%m-%d").to_string())?);
            current = current
                .succ_opt()
                .ok_or_else(|| StorageError::IntegrityViolation("Date overflow".to_string()))?;
        }

        Ok(all_events)
    }
}

/// Helper macro for logging audit events.
///
/// ```rust,ignore
/// audit_log!(state.audit, AuditEventType::CapsuleDeleted, actor, "capsule", id);
/// ```
#[macro_export]
macro_rules! audit_log {
    ($audit:expr, $event_type:expr, $actor:expr) => {{
        let event =
            $crate::storage::AuditEvent::new($event_type).with_account($actor.account_id);
        $audit.record(event);
    }};
    ($audit:expr, $event_type:expr, $actor:expr, $resource_type:expr, $resource_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_account($actor.account_id)
            .with_resource($resource_type, $resource_id);
        $audit.record(event);
    }};
}
