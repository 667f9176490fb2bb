//! Reconciliation DTOs

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::PipelineDocument;
use crate::domain::scope::PipelineScope;

/// Request to compare a document against its template-expanded canonical form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeDrift {
    pub scope: PipelineScope,
    pub document: PipelineDocument,
}

/// Drift between a document and its canonical form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub out_of_sync: bool,
    #[serde(default)]
    pub canonical_document: Option<PipelineDocument>,
    #[serde(default)]
    pub diff_summary: Option<String>,
}
