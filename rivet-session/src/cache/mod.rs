//! Local cache store
//!
//! Persistent key-value storage of cache records, one record per identity key. Writing
//! a record replaces whatever was stored under the same key; merging happens in the
//! orchestrator before the write.
//!
//! Stores are trait-based so the engine can run against an in-memory map in tests and
//! a directory on disk in the CLI.

mod file;
mod memory;
mod writer;

pub use file::FileCacheStore;
pub use memory::InMemoryCacheStore;
pub(crate) use writer::CacheWriter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rivet_core::domain::pipeline::{
    EntityValidityDetails, GitDetails, PipelineDocument, StoreMetadata,
};
use rivet_core::domain::template::TemplateTypes;
use rivet_core::identity::IdentityKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::state::SessionState;

/// Persisted unit of one editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub identity_key: IdentityKey,
    pub pipeline: PipelineDocument,
    pub original_pipeline: PipelineDocument,
    #[serde(default)]
    pub git_details: Option<GitDetails>,
    #[serde(default)]
    pub store_metadata: Option<StoreMetadata>,
    #[serde(default)]
    pub entity_validity_details: EntityValidityDetails,
    #[serde(default)]
    pub template_types: TemplateTypes,
    #[serde(default)]
    pub template_schema_errors: Vec<String>,
    pub cached_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Snapshot of the given state under its own identity key
    pub fn from_state(state: &SessionState, cached_at: DateTime<Utc>) -> Self {
        Self {
            identity_key: state.identity_key(),
            pipeline: state.pipeline.clone(),
            original_pipeline: state.original_pipeline.clone(),
            git_details: state.git_details.clone(),
            store_metadata: state.store_metadata.clone(),
            entity_validity_details: state.entity_validity_details.clone(),
            template_types: state.template_types.clone(),
            template_schema_errors: state.template_schema_errors.clone(),
            cached_at,
        }
    }

    /// True when the cached document carries edits not present in its original
    pub fn has_unsaved_changes(&self) -> bool {
        !rivet_core::compare::documents_equal(&self.pipeline, &self.original_pipeline)
    }
}

/// Errors raised by cache drivers
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem operation failed
    #[error("cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded or decoded
    #[error("cache record is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage medium is not available
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Persistent key-value store of cache records
///
/// `get` after a completed `put` with the same key on the same store returns the
/// written record. Consistency across processes sharing a medium is not guaranteed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads the record stored under `key`
    async fn get(&self, key: &IdentityKey) -> Result<Option<CacheRecord>, CacheError>;

    /// Stores the record under its own key, replacing any previous record
    async fn put(&self, record: CacheRecord) -> Result<(), CacheError>;

    /// Removes the record stored under `key`; removing a missing key succeeds
    async fn delete(&self, key: &IdentityKey) -> Result<(), CacheError>;
}
