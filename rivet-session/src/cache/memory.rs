//! In-memory cache store

use async_trait::async_trait;
use rivet_core::identity::IdentityKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{CacheError, CacheRecord, CacheStore};

/// Cache store backed by a shared map
///
/// Clones share the same map, which lets several sessions in one process observe
/// each other's writes the way tabs share a browser database.
#[derive(Clone, Default)]
pub struct InMemoryCacheStore {
    records: Arc<Mutex<HashMap<IdentityKey, CacheRecord>>>,
}

impl InMemoryCacheStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Keys currently stored, sorted
    pub fn keys(&self) -> Vec<IdentityKey> {
        let mut keys: Vec<_> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<IdentityKey, CacheRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &IdentityKey) -> Result<Option<CacheRecord>, CacheError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put(&self, record: CacheRecord) -> Result<(), CacheError> {
        self.lock().insert(record.identity_key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &IdentityKey) -> Result<(), CacheError> {
        self.lock().remove(key);
        Ok(())
    }
}
