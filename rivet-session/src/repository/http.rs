//! HTTP implementations of the repositories

use async_trait::async_trait;
use rivet_client::{ClientError, OrchestratorClient};
use rivet_core::domain::pipeline::PipelineDocument;
use rivet_core::domain::scope::PipelineScope;
use rivet_core::domain::template::TemplateTypes;
use rivet_core::dto::pipeline::{FetchedPipeline, SavePipeline, SaveResult};
use rivet_core::dto::reconcile::{ComputeDrift, DriftReport};
use rivet_core::dto::template::ResolveTemplateTypes;

use super::{PipelineRepository, ReconcileRepository, TemplateRepository};

#[async_trait]
impl PipelineRepository for OrchestratorClient {
    async fn fetch_document(&self, scope: &PipelineScope) -> Result<FetchedPipeline, ClientError> {
        self.fetch_pipeline_document(scope).await
    }

    async fn save_document(&self, req: SavePipeline) -> Result<SaveResult, ClientError> {
        self.save_pipeline_document(&req).await
    }
}

#[async_trait]
impl TemplateRepository for OrchestratorClient {
    async fn resolve_template_types(
        &self,
        template_refs: Vec<String>,
        scope: &PipelineScope,
    ) -> Result<TemplateTypes, ClientError> {
        let req = ResolveTemplateTypes {
            scope: scope.clone(),
            template_refs,
        };
        OrchestratorClient::resolve_template_types(self, &req).await
    }
}

#[async_trait]
impl ReconcileRepository for OrchestratorClient {
    async fn compute_drift(
        &self,
        document: &PipelineDocument,
        scope: &PipelineScope,
    ) -> Result<DriftReport, ClientError> {
        let req = ComputeDrift {
            scope: scope.clone(),
            document: document.clone(),
        };
        OrchestratorClient::compute_drift(self, &req).await
    }
}
