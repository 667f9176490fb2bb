//! File-backed cache store
//!
//! One JSON file per record inside a cache directory. The file name is the URL-safe
//! base64 encoding of the identity key, so distinct keys never share a file and no key
//! can escape the directory. Keys whose encoding would exceed the file name limit are
//! named by their SHA-256 digest instead. Writes go to a temporary sibling first and are renamed
//! into place, so a reader never observes a half-written record.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rivet_core::identity::IdentityKey;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{CacheError, CacheRecord, CacheStore};

const EXTENSION: &str = "json";

/// Longest encoded key used verbatim as a file name (most filesystems cap names at 255 bytes)
const MAX_ENCODED_NAME: usize = 200;

/// Cache store persisting records under a directory
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Creates a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding the record for `key`
    pub fn record_path(&self, key: &IdentityKey) -> PathBuf {
        self.dir.join(format!("{}.{}", file_stem(key), EXTENSION))
    }

    /// Removes every record in the directory, returning how many were removed
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(io_error(&self.dir, source)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| io_error(&self.dir, source))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|source| io_error(&path, source))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &IdentityKey) -> Result<Option<CacheRecord>, CacheError> {
        let path = self.record_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(io_error(&path, source)),
        };

        let record: CacheRecord = serde_json::from_slice(&bytes)?;
        Ok(Some(record))
    }

    async fn put(&self, record: CacheRecord) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| io_error(&self.dir, source))?;

        let path = self.record_path(&record.identity_key);
        let tmp = self
            .dir
            .join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let bytes = serde_json::to_vec_pretty(&record)?;

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| io_error(&tmp, source))?;
        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(&path, source));
        }

        debug!("Wrote cache record {} ({} bytes)", record.identity_key, bytes.len());
        Ok(())
    }

    async fn delete(&self, key: &IdentityKey) -> Result<(), CacheError> {
        let path = self.record_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(io_error(&path, source)),
        }
    }
}

fn file_stem(key: &IdentityKey) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(key.as_str());
    if encoded.len() <= MAX_ENCODED_NAME {
        return encoded;
    }
    // '~' never appears in URL-safe base64, so digests cannot collide with short names.
    format!("~{:x}", Sha256::digest(key.as_str().as_bytes()))
}

fn io_error(path: &Path, source: io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionState;
    use rivet_core::domain::pipeline::PipelineDocument;
    use rivet_core::domain::scope::PipelineScope;
    use serde_json::json;

    fn record(branch: &str) -> CacheRecord {
        let scope = PipelineScope::new("acct", "org", "proj", "p1")
            .with_repo_name("team/repo")
            .with_branch(branch);
        let mut state = SessionState::new(scope);
        state.pipeline = PipelineDocument::new("p1", "Build")
            .with_body(json!({ "stages": [{ "name": "compile" }] }));
        CacheRecord::from_state(&state, chrono::Utc::now())
    }

    #[tokio::test]
    async fn test_roundtrip_survives_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let rec = record("main");

        FileCacheStore::new(dir.path()).put(rec.clone()).await.unwrap();

        let reopened = FileCacheStore::new(dir.path());
        assert_eq!(reopened.get(&rec.identity_key).await.unwrap(), Some(rec));
    }

    #[tokio::test]
    async fn test_record_path_stays_inside_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        let rec = record("../../etc");

        let path = store.record_path(&rec.identity_key);
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_long_keys_get_bounded_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        let long = record(&"feature/".repeat(40));
        let other = record(&format!("{}x", "feature/".repeat(40)));

        let path = store.record_path(&long.identity_key);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.len() < 255);
        assert_ne!(path, store.record_path(&other.identity_key));

        store.put(long.clone()).await.unwrap();
        store.put(other.clone()).await.unwrap();
        assert_eq!(store.get(&long.identity_key).await.unwrap(), Some(long.clone()));
        assert_eq!(store.get(&other.identity_key).await.unwrap(), Some(other));

        store.delete(&long.identity_key).await.unwrap();
        assert!(store.get(&long.identity_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_short_keys_keep_encoded_names() {
        let store = FileCacheStore::new("/tmp/rivet");
        let rec = record("main");
        let name = store.record_path(&rec.identity_key);
        assert!(!name.file_name().unwrap().to_str().unwrap().starts_with('~'));
    }

    #[tokio::test]
    async fn test_missing_record_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join("nested"));
        let rec = record("main");

        assert!(store.get(&rec.identity_key).await.unwrap().is_none());
        store.delete(&rec.identity_key).await.unwrap();

        store.put(rec.clone()).await.unwrap();
        store.delete(&rec.identity_key).await.unwrap();
        assert!(store.get(&rec.identity_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        let rec = record("main");

        tokio::fs::write(store.record_path(&rec.identity_key), b"{not json")
            .await
            .unwrap();
        assert!(matches!(
            store.get(&rec.identity_key).await,
            Err(CacheError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_removes_all_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        store.put(record("main")).await.unwrap();
        store.put(record("dev")).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.clear().await.unwrap(), 0);
    }
}
