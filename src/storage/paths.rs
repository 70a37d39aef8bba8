// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-disk storage layout.

use std::path::{Path, PathBuf};

/// Default base directory for all persistent storage.
pub const DATA_ROOT: &str = "./data";

/// File name of the embedded database under the data root.
pub const DATABASE_FILE: &str = "capsules.redb";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the redb database holding accounts, capsules and sessions.
    pub fn database_file(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    // ========== Media Paths ==========

    /// Directory containing all uploaded media artifacts.
    pub fn media_dir(&self) -> PathBuf {
        self.root.join("media")
    }

    /// Path to a stored media artifact. `key` must already be sanitized.
    pub fn media_file(&self, key: &str) -> PathBuf {
        self.media_dir().join(key)
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_use_data_root() {
        let paths = StoragePaths::default();
        assert_eq!(paths.root(), Path::new("./data"));
    }

    #[test]
    fn database_and_media_paths_are_correct() {
        let paths = StoragePaths::new("/tmp/test-data");
        assert_eq!(
            paths.database_file(),
            PathBuf::from("/tmp/test-data/capsules.redb")
        );
        assert_eq!(paths.media_dir(), PathBuf::from("/tmp/test-data/media"));
        assert_eq!(
            paths.media_file("abc.png"),
            PathBuf::from("/tmp/test-data/media/abc.png")
        );
    }

    #[test]
    fn audit_paths_are_correct() {
        let paths = StoragePaths::new("/srv/capsules");
        assert_eq!(paths.audit_dir(), PathBuf::from("/srv/capsules/audit"));
        assert_eq!(
            paths.audit_events_file("2030-01-02"),
            PathBuf::from("/srv/capsules/audit/2030-01-02/events.jsonl")
        );
    }
}
