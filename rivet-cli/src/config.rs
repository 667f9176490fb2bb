//! Configuration module
//!
//! Turns CLI flags into session settings and opens sessions from them.

use anyhow::{Context, Result};
use rivet_client::OrchestratorClient;
use rivet_core::domain::scope::PipelineScope;
use rivet_session::{FileCacheStore, Session, SessionConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings shared by every session the command opens
    pub session: SessionConfig,

    /// Print applied actions after each command
    pub verbose: bool,
}

impl Config {
    pub fn new(
        orchestrator_url: String,
        cache_dir: Option<PathBuf>,
        timeout_secs: u64,
        account_id: String,
        verbose: bool,
    ) -> Result<Self> {
        let mut session = SessionConfig::new(orchestrator_url)
            .with_request_timeout(Duration::from_secs(timeout_secs));
        if let Some(dir) = cache_dir {
            session = session.with_cache_dir(dir);
        }
        session.account_id = account_id;
        session.validate().context("Invalid configuration")?;

        Ok(Self { session, verbose })
    }

    /// File-backed cache store under the configured directory
    pub fn cache(&self) -> FileCacheStore {
        FileCacheStore::new(&self.session.cache_dir)
    }

    /// Opens a session for `scope` against the configured service and cache
    pub fn open_session(&self, scope: PipelineScope) -> Result<Session> {
        let client = OrchestratorClient::with_timeout(
            &self.session.orchestrator_url,
            self.session.request_timeout,
        )
        .context("Failed to build HTTP client")?;

        Session::builder(scope)
            .cache(Arc::new(self.cache()))
            .client(client)
            .build()
            .context("Failed to open session")
    }
}
