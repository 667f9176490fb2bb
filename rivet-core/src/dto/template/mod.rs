//! Template resolution DTOs

use serde::{Deserialize, Serialize};

use crate::domain::scope::PipelineScope;

/// Request to resolve the types of a set of template references
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTemplateTypes {
    pub scope: PipelineScope,
    pub template_refs: Vec<String>,
}
