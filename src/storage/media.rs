// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Media reference resolver.
//!
//! Uploaded photos and videos are stored as flat files under the media
//! root. The core only ever sees a [`MediaReference`], an opaque key that
//! names exactly one file directly inside that root.
//!
//! ## Key format
//!
//! ```text
//! <uuid-v4>[-<stem>][.<ext>]
//! ```
//!
//! `stem` and `ext` are derived from the client-supplied file name by
//! keeping only `[A-Za-z0-9_-]`, so a key can never contain a path
//! separator or `..`. The UUID prefix makes keys collision resistant.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{FileStorage, StorageError, StorageResult};

const MAX_STEM_LEN: usize = 48;
const MAX_EXT_LEN: usize = 8;

/// Opaque handle to a stored binary artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct MediaReference(String);

impl MediaReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase file extension of the key, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }

    /// Best-effort MIME type derived from the extension.
    pub fn content_type(&self) -> &'static str {
        match self.extension() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("heic") => "image/heic",
            Some("mp4") | Some("m4v") => "video/mp4",
            Some("webm") => "video/webm",
            Some("mov") => "video/quicktime",
            _ => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for MediaReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage collaborator for capsule attachments.
pub trait MediaResolver: Send + Sync {
    /// Persist an artifact and return the reference that retrieves it.
    fn store(&self, bytes: &[u8], suggested_name: &str) -> StorageResult<MediaReference>;

    /// Read back the bytes behind a reference.
    fn resolve(&self, reference: &MediaReference) -> StorageResult<Vec<u8>>;

    /// Remove an artifact. Used to clean up after a failed capsule creation.
    fn discard(&self, reference: &MediaReference) -> StorageResult<()>;
}

/// Keep only characters that are safe in a single path component.
fn sanitize_component(raw: &str, max_len: usize) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(max_len)
        .collect()
}

/// Build a fresh key for an upload named `suggested_name`.
pub fn media_key(suggested_name: &str) -> String {
    // Only the final path component of the client name is meaningful
    let file_name = suggested_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (file_name, None),
    };

    let stem = sanitize_component(stem, MAX_STEM_LEN);
    let ext = ext
        .map(|e| sanitize_component(e, MAX_EXT_LEN).to_ascii_lowercase())
        .filter(|e| !e.is_empty());

    let mut key = uuid::Uuid::new_v4().to_string();
    if !stem.is_empty() {
        key.push('-');
        key.push_str(&stem);
    }
    if let Some(ext) = ext {
        key.push('.');
        key.push_str(&ext);
    }
    key
}

/// Whether `key` is a plain file name that stays inside the media root.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && !key.contains("..")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Media store writing into `<data root>/media/`.
pub struct FsMediaStore {
    storage: Arc<FileStorage>,
}

impl FsMediaStore {
    pub fn new(storage: Arc<FileStorage>) -> Self {
        Self { storage }
    }

    fn path_for(&self, reference: &MediaReference) -> StorageResult<PathBuf> {
        if !is_valid_key(reference.as_str()) {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }
        Ok(self.storage.paths().media_file(reference.as_str()))
    }
}

impl MediaResolver for FsMediaStore {
    fn store(&self, bytes: &[u8], suggested_name: &str) -> StorageResult<MediaReference> {
        let reference = MediaReference(media_key(suggested_name));
        let path = self.path_for(&reference)?;
        self.storage.write_raw(&path, bytes)?;

        tracing::debug!(
            media_key = %reference,
            size = bytes.len(),
            "Stored media artifact"
        );
        Ok(reference)
    }

    fn resolve(&self, reference: &MediaReference) -> StorageResult<Vec<u8>> {
        let path = self.path_for(reference)?;
        self.storage.read_raw(path)
    }

    fn discard(&self, reference: &MediaReference) -> StorageResult<()> {
        let path = self.path_for(reference)?;
        self.storage.delete(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn media_store() -> (FsMediaStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (FsMediaStore::new(Arc::new(storage)), temp)
    }

    #[test]
    fn key_keeps_safe_stem_and_lowercase_extension() {
        let key = media_key("Holiday Photo.JPG");
        assert!(key.ends_with("-HolidayPhoto.jpg"), "{key}");
        assert!(is_valid_key(&key));
    }

    #[test]
    fn key_strips_path_traversal() {
        for name in ["../../etc/passwd", "..\\..\\boot.ini", "/abs/path/x.png", "..", ""] {
            let key = media_key(name);
            assert!(is_valid_key(&key), "{name} -> {key}");
            assert!(!key.contains('/'));
            assert!(!key.contains('\\'));
            assert!(!key.contains(".."));
        }
    }

    #[test]
    fn keys_do_not_collide_for_same_name() {
        assert_ne!(media_key("a.png"), media_key("a.png"));
    }

    #[test]
    fn invalid_keys_are_rejected() {
        assert!(!is_valid_key("../secret"));
        assert!(!is_valid_key("dir/file"));
        assert!(!is_valid_key(".hidden"));
        assert!(!is_valid_key(""));
        assert!(is_valid_key("0f8c-photo.png"));
    }

    #[test]
    fn store_resolve_discard() {
        let (store, _temp) = media_store();
        let reference = store.store(b"\x89PNG data", "cat.png").unwrap();
        assert_eq!(reference.content_type(), "image/png");

        assert_eq!(store.resolve(&reference).unwrap(), b"\x89PNG data");

        store.discard(&reference).unwrap();
        assert!(matches!(
            store.resolve(&reference),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn resolve_rejects_escaping_reference() {
        let (store, _temp) = media_store();
        let forged = MediaReference("../capsules.redb".to_string());
        assert!(matches!(
            store.resolve(&forged),
            Err(StorageError::InvalidReference(_))
        ));
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let reference = MediaReference("abc".to_string());
        assert_eq!(reference.content_type(), "application/octet-stream");
        assert_eq!(MediaReference("x.mov".into()).content_type(), "video/quicktime");
    }
}
