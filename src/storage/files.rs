// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Filesystem operations for media artifacts and audit logs.
//!
//! All writes of whole files go through a temp file + rename so a reader
//! never observes a half-written artifact.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{StorageError, StoragePaths, StorageResult};

const HEALTH_PROBE_FILE: &str = ".health_check";
const HEALTH_PROBE_DATA: &[u8] = b"time-capsule health probe";

/// File storage rooted at [`StoragePaths::root`].
///
/// Every operation except [`initialize`](Self::initialize) fails with
/// `NotInitialized` until the directory tree exists.
#[derive(Debug, Clone)]
pub struct FileStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl FileStorage {
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }

    /// Create the root, media and audit directories. Idempotent.
    pub fn initialize(&mut self) -> StorageResult<()> {
        fs::create_dir_all(self.paths.root())?;
        fs::create_dir_all(self.paths.media_dir())?;
        fs::create_dir_all(self.paths.audit_dir())?;
        self.initialized = true;
        Ok(())
    }

    /// Write, read back and remove a probe file under the root.
    pub fn health_check(&self) -> StorageResult<()> {
        self.ensure_initialized()?;

        let probe = self.paths.root().join(HEALTH_PROBE_FILE);
        fs::write(&probe, HEALTH_PROBE_DATA)?;
        let read_back = fs::read(&probe)?;
        fs::remove_file(&probe)?;

        if read_back != HEALTH_PROBE_DATA {
            return Err(StorageError::IntegrityViolation(
                "health probe read back different bytes".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace `path` with `data` atomically (temp file, fsync, rename).
    pub fn write_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let staging = staging_path(path);
        let written = File::create(&staging).and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }

        fs::rename(&staging, path)?;
        Ok(())
    }

    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        self.ensure_initialized()?;
        Ok(fs::read(path.as_ref())?)
    }

    /// Append `line` plus a newline in a single write, creating the file
    /// and its parent directory on first use.
    pub fn append_line(&self, path: impl AsRef<Path>, line: &str) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut record = Vec::with_capacity(line.len() + 1);
        record.extend_from_slice(line.as_bytes());
        record.push(b'\n');

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?
            .write_all(&record)?;
        Ok(())
    }

    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        self.ensure_initialized()?;
        fs::remove_file(path.as_ref())?;
        Ok(())
    }
}

/// Sibling of `path` used while a write is in flight.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_storage() -> (FileStorage, TempDir) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut storage = FileStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().expect("Failed to initialize test storage");
        (storage, temp)
    }

    #[test]
    fn initialize_creates_directories() {
        let (storage, _temp) = test_storage();

        assert!(storage.paths().media_dir().exists());
        assert!(storage.paths().audit_dir().exists());
        assert!(storage.is_initialized());
    }

    #[test]
    fn write_and_read_raw() {
        let (storage, _temp) = test_storage();
        let data = b"raw test data with\nnewlines\nand bytes: \x00\x01\x02";

        let path = storage.paths().media_file("blob.bin");
        storage.write_raw(&path, data).unwrap();

        assert_eq!(storage.read_raw(&path).unwrap(), data);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn append_line_accumulates() {
        let (storage, _temp) = test_storage();
        let path = storage.paths().audit_events_file("2030-01-01");

        storage.append_line(&path, "one").unwrap();
        storage.append_line(&path, "two").unwrap();

        let content = String::from_utf8(storage.read_raw(&path).unwrap()).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }

    #[test]
    fn health_check_works() {
        let (storage, _temp) = test_storage();
        storage.health_check().expect("Health check should pass");
    }

    #[test]
    fn delete_file_removes_it() {
        let (storage, _temp) = test_storage();
        let path = storage.paths().media_file("gone.bin");
        storage.write_raw(&path, b"x").unwrap();

        assert!(path.is_file());
        storage.delete(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn reading_missing_file_is_not_found() {
        let (storage, _temp) = test_storage();
        let result = storage.read_raw(storage.paths().media_file("missing"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn uninitialized_storage_returns_error() {
        let storage = FileStorage::new(StoragePaths::new("/tmp/never-init"));

        let result = storage.read_raw("/tmp/any.bin");
        assert!(matches!(result, Err(StorageError::NotInitialized)));
    }
}
