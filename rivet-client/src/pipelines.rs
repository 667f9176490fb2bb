//! Pipeline document API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use rivet_core::domain::scope::PipelineScope;
use rivet_core::dto::pipeline::{FetchedPipeline, SavePipeline, SaveResult};

impl OrchestratorClient {
    // =============================================================================
    // Pipeline Documents
    // =============================================================================

    /// Fetch a pipeline document with its git and validity metadata
    ///
    /// # Arguments
    /// * `scope` - Account, organization, project, pipeline and optional repo/branch
    ///
    /// # Returns
    /// The document as stored by the service
    ///
    /// # Example
    /// ```no_run
    /// # use rivet_client::OrchestratorClient;
    /// # use rivet_core::domain::scope::PipelineScope;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// let scope = PipelineScope::new("acct", "org", "proj", "build")
    ///     .with_repo_name("infra")
    ///     .with_branch("main");
    /// let fetched = client.fetch_pipeline_document(&scope).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_pipeline_document(&self, scope: &PipelineScope) -> Result<FetchedPipeline> {
        let url = format!("{}/api/pipeline/{}", self.base_url, scope.pipeline_id);
        tracing::debug!("GET {} (branch={:?})", url, scope.branch);
        let response = self.client.get(&url).query(scope).send().await?;

        self.handle_response(response).await
    }

    /// Save (publish) a pipeline document
    ///
    /// # Arguments
    /// * `req` - Scope, document, git association and the base object id
    ///
    /// # Returns
    /// The stored document and its new git coordinates. A 409 response means the base
    /// object moved since the document was fetched.
    pub async fn save_pipeline_document(&self, req: &SavePipeline) -> Result<SaveResult> {
        let url = format!("{}/api/pipeline/{}", self.base_url, req.scope.pipeline_id);
        tracing::debug!("PUT {}", url);
        let response = self.client.put(&url).json(req).send().await?;

        self.handle_response(response).await
    }
}
