//! Session state
//!
//! One snapshot of an editing session. Everything here is plain data; transitions
//! happen only through [`crate::reducer::reduce`].

use rivet_core::compare::documents_equal;
use rivet_core::domain::pipeline::{
    EntityValidityDetails, GitDetails, PipelineDocument, StoreMetadata,
};
use rivet_core::domain::scope::PipelineScope;
use rivet_core::domain::template::TemplateTypes;
use rivet_core::identity::{IdentityKey, derive_key};

use crate::error::FetchFailure;

/// Selected element inside the pipeline editor
///
/// Opaque to the engine; it is stored and replaced, never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub stage_id: Option<String>,
    pub step_id: Option<String>,
    pub section_id: Option<String>,
}

impl Selection {
    pub fn stage(stage_id: impl Into<String>) -> Self {
        Self {
            stage_id: Some(stage_id.into()),
            ..Default::default()
        }
    }

    pub fn step(stage_id: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            stage_id: Some(stage_id.into()),
            step_id: Some(step_id.into()),
            section_id: None,
        }
    }
}

/// Result of comparing the document with its canonical, template-expanded form
#[derive(Debug, Clone, PartialEq)]
pub struct DriftDetails {
    /// Summary reported by the reconciliation service
    pub summary: Option<String>,
    /// JSON-pointer paths where the current document differs from the canonical one
    pub paths: Vec<String>,
    /// Canonical document, when the service returned one
    pub canonical: Option<PipelineDocument>,
}

/// Reconciliation progress
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReconcileStatus {
    #[default]
    Idle,
    InProgress,
    InSync,
    OutOfSync(DriftDetails),
    Failed(String),
}

/// Full state of one pipeline editing session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Scope the session currently addresses
    pub scope: PipelineScope,
    /// Document as currently edited
    pub pipeline: PipelineDocument,
    /// Last synchronized snapshot; edits are measured against it
    pub original_pipeline: PipelineDocument,
    /// Document as last seen on the authoring service
    pub backend_pipeline: Option<PipelineDocument>,
    pub git_details: Option<GitDetails>,
    pub store_metadata: Option<StoreMetadata>,
    pub entity_validity_details: EntityValidityDetails,
    pub template_types: TemplateTypes,
    pub template_schema_errors: Vec<String>,

    /// Derived: `pipeline` differs from `original_pipeline`
    pub is_updated: bool,
    /// Derived: `original_pipeline` differs from `backend_pipeline`
    pub is_backend_updated: bool,
    pub is_loading: bool,
    pub is_saving: bool,
    pub is_initialized: bool,

    pub selection: Selection,
    pub remote_fetch_error: Option<FetchFailure>,
    pub template_error: Option<String>,
    pub save_error: Option<FetchFailure>,
    pub reconcile_status: ReconcileStatus,
}

impl SessionState {
    /// Creates the state of a session that has not fetched anything yet
    pub fn new(scope: PipelineScope) -> Self {
        let pipeline = PipelineDocument::new(scope.pipeline_id.clone(), "")
            .with_scope(scope.org_id.clone(), scope.project_id.clone());
        Self {
            scope,
            original_pipeline: pipeline.clone(),
            pipeline,
            ..Default::default()
        }
    }

    /// Cache key of the scope this state addresses
    pub fn identity_key(&self) -> IdentityKey {
        derive_key(&self.scope)
    }

    /// True when the edited document differs from its last synchronized snapshot
    pub fn has_unsaved_changes(&self) -> bool {
        !documents_equal(&self.pipeline, &self.original_pipeline)
    }

    /// Recomputes `is_updated` and `is_backend_updated` from the documents
    pub(crate) fn refresh_flags(&mut self) {
        self.is_updated = self.has_unsaved_changes();
        self.is_backend_updated = self
            .backend_pipeline
            .as_ref()
            .is_some_and(|backend| !documents_equal(&self.original_pipeline, backend));
    }
}
