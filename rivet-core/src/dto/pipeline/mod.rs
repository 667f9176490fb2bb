//! Pipeline DTOs for fetching and saving documents

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::{EntityValidityDetails, GitDetails, PipelineDocument, StoreMetadata};
use crate::domain::scope::PipelineScope;

/// A pipeline document as returned by the authoring service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedPipeline {
    pub document: PipelineDocument,
    #[serde(default)]
    pub git_details: Option<GitDetails>,
    #[serde(default)]
    pub store_metadata: Option<StoreMetadata>,
    #[serde(default)]
    pub entity_validity_details: Option<EntityValidityDetails>,
    #[serde(default)]
    pub template_schema_errors: Vec<String>,
}

impl FetchedPipeline {
    pub fn new(document: PipelineDocument) -> Self {
        Self {
            document,
            git_details: None,
            store_metadata: None,
            entity_validity_details: None,
            template_schema_errors: Vec::new(),
        }
    }
}

/// Request to save (publish) a pipeline document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePipeline {
    pub scope: PipelineScope,
    pub document: PipelineDocument,
    #[serde(default)]
    pub git_details: Option<GitDetails>,
    /// Git object the edit was based on; the service rejects the save if it moved
    #[serde(default)]
    pub base_object_id: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
}

/// Result of a successful save
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    /// Document as stored, when the service normalizes it
    #[serde(default)]
    pub document: Option<PipelineDocument>,
    #[serde(default)]
    pub git_details: Option<GitDetails>,
}
