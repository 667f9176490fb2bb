//! Rivet Session
//!
//! Client-side editing session for a single pipeline document.
//!
//! Architecture:
//! - State: one plain-data snapshot of the session, changed only by the reducer
//! - Reducer: pure `(state, action) -> state` transitions
//! - Cache: persistent records addressed by the scope's identity key
//! - Orchestrator: async routines doing remote and cache I/O, dispatching actions
//! - Reconciler: drift detection against the canonical document
//! - Session: the façade the application holds
//!
//! Unsaved edits survive restarts through the cache; a refetch never silently drops
//! them unless forced.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rivet_client::OrchestratorClient;
//! use rivet_core::domain::scope::PipelineScope;
//! use rivet_session::{FetchParams, FileCacheStore, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let scope = PipelineScope::new("acct", "org", "proj", "build").with_branch("main");
//!     let session = Session::builder(scope)
//!         .cache(Arc::new(FileCacheStore::new(".rivet/sessions")))
//!         .client(OrchestratorClient::new("http://localhost:8080"))
//!         .build()?;
//!
//!     session.fetch(FetchParams::default()).await;
//!     println!("unsaved changes: {}", session.state().is_updated);
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod cache;
pub mod config;
pub mod error;
mod orchestrator;
mod reconcile;
pub mod reducer;
pub mod repository;
mod session;
pub mod state;
mod store;

pub use action::Action;
pub use cache::{CacheError, CacheRecord, CacheStore, FileCacheStore, InMemoryCacheStore};
pub use config::SessionConfig;
pub use error::{FetchErrorKind, FetchFailure, SessionError};
pub use orchestrator::{
    DocumentUpdate, FetchOutcome, FetchParams, SaveOptions, SaveOutcome, ScopeAssociation,
};
pub use reconcile::ReconcileOutcome;
pub use session::{Session, SessionBuilder};
pub use state::{DriftDetails, ReconcileStatus, Selection, SessionState};
