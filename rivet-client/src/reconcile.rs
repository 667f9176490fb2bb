//! Reconciliation API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use rivet_core::dto::reconcile::{ComputeDrift, DriftReport};

impl OrchestratorClient {
    // =============================================================================
    // Reconciliation
    // =============================================================================

    /// Compare a document against its fully template-expanded canonical form
    ///
    /// # Arguments
    /// * `req` - The scope and the document as currently edited
    ///
    /// # Returns
    /// Whether the document is out of sync, and the canonical document when it is
    pub async fn compute_drift(&self, req: &ComputeDrift) -> Result<DriftReport> {
        let url = format!(
            "{}/api/pipeline/{}/reconcile",
            self.base_url, req.scope.pipeline_id
        );
        tracing::debug!("POST {}", url);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }
}
