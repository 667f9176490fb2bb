//! Rivet HTTP Client
//!
//! A simple, type-safe HTTP client for communicating with the Rivet authoring service.
//!
//! The session engine reaches the service through three narrow seams (pipeline
//! documents, template types, reconciliation); this crate provides the HTTP calls
//! behind each of them.
//!
//! # Example
//!
//! ```no_run
//! use rivet_client::OrchestratorClient;
//! use rivet_core::domain::scope::PipelineScope;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OrchestratorClient::new("http://localhost:8080");
//!
//!     let scope = PipelineScope::new("acct", "org", "proj", "build").with_branch("main");
//!     let fetched = client.fetch_pipeline_document(&scope).await?;
//!
//!     println!("Fetched pipeline: {}", fetched.document.name);
//!     Ok(())
//! }
//! ```

pub mod error;
mod pipelines;
mod reconcile;
mod templates;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the Rivet authoring service API
///
/// This client provides methods for the endpoints the session engine needs,
/// organized into logical groups:
/// - Pipeline documents (fetch, save)
/// - Template type resolution
/// - Reconciliation against the template-expanded canonical document
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    /// Base URL of the authoring service (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl OrchestratorClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the service API (e.g., "http://localhost:8080")
    ///
    /// # Example
    /// ```
    /// use rivet_client::OrchestratorClient;
    ///
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the service API
    /// * `client` - A configured reqwest Client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a new client whose requests time out after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("API call failed with status {}: {}", status, error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
