//! Session actions
//!
//! Every legal transition of the session is one variant here. Actions carry only the
//! data their transition needs.

use rivet_core::domain::pipeline::{
    EntityValidityDetails, GitDetails, PipelineDocument, StoreMetadata,
};
use rivet_core::domain::scope::PipelineScope;
use rivet_core::domain::template::TemplateTypes;

use crate::error::FetchFailure;
use crate::state::{DriftDetails, Selection};

/// Metadata that travels with a fetched document
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub git_details: Option<GitDetails>,
    pub store_metadata: Option<StoreMetadata>,
    pub entity_validity_details: EntityValidityDetails,
    pub template_types: TemplateTypes,
    pub template_schema_errors: Vec<String>,
    pub template_error: Option<String>,
}

/// A fetch whose document supersedes the local state
#[derive(Debug, Clone)]
pub struct FetchSuccessPayload {
    pub scope: PipelineScope,
    pub pipeline: PipelineDocument,
    pub metadata: DocumentMetadata,
}

/// A fetch that kept unsaved edits found in the cache
#[derive(Debug, Clone)]
pub struct RestorePayload {
    pub scope: PipelineScope,
    pub pipeline: PipelineDocument,
    pub original_pipeline: PipelineDocument,
    /// Document just fetched from the service
    pub backend_pipeline: PipelineDocument,
    pub metadata: DocumentMetadata,
}

/// A completed save
#[derive(Debug, Clone)]
pub struct SaveSuccessPayload {
    /// Document that was sent
    pub submitted: PipelineDocument,
    /// Document as stored by the service
    pub saved: PipelineDocument,
    pub git_details: Option<GitDetails>,
}

/// Session state transitions
#[derive(Debug, Clone)]
pub enum Action {
    Initialize,
    FetchStart,
    FetchSuccess(Box<FetchSuccessPayload>),
    RestoreFromCache(Box<RestorePayload>),
    FetchError {
        error: Option<FetchFailure>,
        template_error: Option<String>,
    },
    UpdatePipeline(Box<PipelineDocument>),
    UpdateSelection(Selection),
    SetScope(PipelineScope),
    UpdateGitDetails(GitDetails),
    UpdateStoreMetadata(StoreMetadata),
    UpdateEntityValidity(EntityValidityDetails),
    SetTemplateTypes(TemplateTypes),
    SetTemplateError(Option<String>),
    SaveStart,
    SaveSuccess(Box<SaveSuccessPayload>),
    SaveError(FetchFailure),
    DiscardChanges,
    ReconcileStart,
    ReconcileSuccess(Option<DriftDetails>),
    ReconcileError(String),
    ReconcileApplied,
}

impl Action {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::Initialize => "Initialize",
            Action::FetchStart => "FetchStart",
            Action::FetchSuccess(_) => "FetchSuccess",
            Action::RestoreFromCache(_) => "RestoreFromCache",
            Action::FetchError { .. } => "FetchError",
            Action::UpdatePipeline(_) => "UpdatePipeline",
            Action::UpdateSelection(_) => "UpdateSelection",
            Action::SetScope(_) => "SetScope",
            Action::UpdateGitDetails(_) => "UpdateGitDetails",
            Action::UpdateStoreMetadata(_) => "UpdateStoreMetadata",
            Action::UpdateEntityValidity(_) => "UpdateEntityValidity",
            Action::SetTemplateTypes(_) => "SetTemplateTypes",
            Action::SetTemplateError(_) => "SetTemplateError",
            Action::SaveStart => "SaveStart",
            Action::SaveSuccess(_) => "SaveSuccess",
            Action::SaveError(_) => "SaveError",
            Action::DiscardChanges => "DiscardChanges",
            Action::ReconcileStart => "ReconcileStart",
            Action::ReconcileSuccess(_) => "ReconcileSuccess",
            Action::ReconcileError(_) => "ReconcileError",
            Action::ReconcileApplied => "ReconcileApplied",
        }
    }

    pub fn update_pipeline(document: PipelineDocument) -> Self {
        Action::UpdatePipeline(Box::new(document))
    }
}
