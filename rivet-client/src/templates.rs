//! Template resolution API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use rivet_core::domain::template::TemplateTypes;
use rivet_core::dto::template::ResolveTemplateTypes;

impl OrchestratorClient {
    // =============================================================================
    // Templates
    // =============================================================================

    /// Resolve the types, icons and service data of a set of template references
    ///
    /// # Arguments
    /// * `req` - The scope and the references to resolve
    pub async fn resolve_template_types(&self, req: &ResolveTemplateTypes) -> Result<TemplateTypes> {
        let url = format!("{}/api/template/types", self.base_url);
        tracing::debug!("POST {} ({} refs)", url, req.template_refs.len());
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }
}
