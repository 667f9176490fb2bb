//! Repository layer
//!
//! Repositories abstract the remote collaborators the session engine talks to. They
//! provide simple, focused interfaces without any session logic:
//! - Pipeline documents (fetch, save)
//! - Template type resolution
//! - Reconciliation against the canonical document
//!
//! All repositories are trait-based to enable testing and mocking. The HTTP
//! implementations live on [`rivet_client::OrchestratorClient`].

mod http;

use async_trait::async_trait;
use rivet_client::ClientError;
use rivet_core::domain::pipeline::PipelineDocument;
use rivet_core::domain::scope::PipelineScope;
use rivet_core::domain::template::TemplateTypes;
use rivet_core::dto::pipeline::{FetchedPipeline, SavePipeline, SaveResult};
use rivet_core::dto::reconcile::DriftReport;

/// Repository trait for pipeline documents on the authoring service
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// Fetches the document and metadata stored for `scope`
    async fn fetch_document(&self, scope: &PipelineScope) -> Result<FetchedPipeline, ClientError>;

    /// Saves a document; a conflict means the base object moved
    async fn save_document(&self, req: SavePipeline) -> Result<SaveResult, ClientError>;
}

/// Repository trait for template metadata
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Resolves types, icons and service data for the given template references
    async fn resolve_template_types(
        &self,
        template_refs: Vec<String>,
        scope: &PipelineScope,
    ) -> Result<TemplateTypes, ClientError>;
}

/// Repository trait for reconciliation
#[async_trait]
pub trait ReconcileRepository: Send + Sync {
    /// Compares `document` against its fully template-expanded canonical form
    async fn compute_drift(
        &self,
        document: &PipelineDocument,
        scope: &PipelineScope,
    ) -> Result<DriftReport, ClientError>;
}
