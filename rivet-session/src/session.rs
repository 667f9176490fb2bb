//! Session façade
//!
//! The object the rest of the application holds: current state, the operations a
//! user can trigger and observation channels. Cloning a [`Session`] is cheap; clones
//! share the same state.

use rivet_client::OrchestratorClient;
use rivet_core::domain::pipeline::PipelineDocument;
use rivet_core::domain::scope::PipelineScope;
use rivet_core::identity::{IdentityKey, derive_key};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::action::Action;
use crate::cache::CacheStore;
use crate::error::SessionError;
use crate::orchestrator::{
    DocumentUpdate, FetchOutcome, FetchParams, Orchestrator, SaveOptions, SaveOutcome,
    ScopeAssociation,
};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::repository::{PipelineRepository, ReconcileRepository, TemplateRepository};
use crate::state::{Selection, SessionState};
use crate::store::StateStore;

/// One pipeline editing session
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    orchestrator: Orchestrator,
    reconciler: Reconciler,
}

impl Session {
    /// Starts building a session for `scope`
    pub fn builder(scope: PipelineScope) -> SessionBuilder {
        SessionBuilder::new(scope)
    }

    /// Process-local identifier, used to tell sessions apart in logs
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.store().snapshot()
    }

    /// Cache key of the scope the session currently addresses
    pub fn identity_key(&self) -> IdentityKey {
        self.store().read(|s| s.identity_key())
    }

    /// Receiver notified after every applied action
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store().subscribe()
    }

    /// Stream of applied actions
    pub fn actions(&self) -> broadcast::Receiver<Action> {
        self.store().actions()
    }

    /// Applies a raw action without any I/O
    pub fn dispatch(&self, action: Action) {
        self.store().dispatch(action);
    }

    /// Fetches the pipeline from the authoring service
    pub async fn fetch(&self, params: FetchParams) -> FetchOutcome {
        self.orchestrator().fetch_pipeline(params).await
    }

    /// Pulls in changes cached by another session; returns true when the state changed
    pub async fn soft_fetch(&self) -> bool {
        self.orchestrator().soft_fetch().await
    }

    /// Replaces the edited document
    ///
    /// The cache write runs in the background, ordered after the session's earlier cache
    /// operations. The receiver resolves to whether the write succeeded.
    pub fn update_pipeline(&self, document: PipelineDocument) -> oneshot::Receiver<bool> {
        self.orchestrator().update_pipeline(document)
    }

    /// Applies an edit on top of the cached document; returns whether unsaved edits remain
    ///
    /// An edit dropped because the scope moved meanwhile leaves the state untouched.
    pub async fn update_document(&self, update: DocumentUpdate) -> bool {
        match self.orchestrator().update_document(update).await {
            Some(is_updated) => is_updated,
            None => self.state().is_updated,
        }
    }

    pub fn update_selection(&self, selection: Selection) {
        self.dispatch(Action::UpdateSelection(selection));
    }

    /// Moves the session to another branch of the same repository and fetches it
    pub async fn switch_branch(&self, branch: impl Into<String>) -> Result<FetchOutcome, SessionError> {
        let scope = self.store().read(|s| s.scope.clone()).with_branch(branch);
        self.switch_scope(scope, true).await
    }

    /// Moves the session to another scope and fetches it
    pub async fn switch_scope(
        &self,
        scope: PipelineScope,
        force_fetch: bool,
    ) -> Result<FetchOutcome, SessionError> {
        scope.validate()?;
        info!("Session {} switching to {}", self.id(), derive_key(&scope));
        Ok(self.orchestrator().switch_scope(scope, force_fetch).await)
    }

    /// Re-associates the session with new git details or store metadata
    pub async fn update_scope_association(&self, change: ScopeAssociation) {
        self.orchestrator().update_scope_association(change).await;
    }

    /// Compares the edited document with its canonical form
    pub async fn reconcile(&self) -> ReconcileOutcome {
        self.inner.reconciler.reconcile(self.orchestrator()).await
    }

    /// Replaces the edited document with the canonical form found by [`Session::reconcile`]
    pub async fn refresh_from_canonical(&self) -> bool {
        self.inner
            .reconciler
            .refresh_from_canonical(self.orchestrator())
            .await
    }

    /// Drops unsaved edits
    pub async fn discard(&self) {
        self.orchestrator().discard().await;
    }

    /// Publishes the edited document
    pub async fn save(&self, options: SaveOptions) -> SaveOutcome {
        self.orchestrator().save(options).await
    }

    /// Deletes the cache record of the current scope
    pub async fn delete_cache(&self) -> bool {
        let scope = self.store().read(|s| s.scope.clone());
        self.orchestrator().delete_session_cache(&scope).await
    }

    /// Deletes the cache record of any scope
    pub async fn delete_session_cache(&self, scope: &PipelineScope) -> bool {
        self.orchestrator().delete_session_cache(scope).await
    }

    /// Cancels the fetch in flight; it dispatches nothing further
    pub fn cancel_fetch(&self) -> bool {
        self.orchestrator().cancel_fetch()
    }

    /// Runs a soft fetch for every focus event received on `events`
    ///
    /// The task ends when every sender is dropped.
    pub fn spawn_focus_listener(&self, mut events: mpsc::Receiver<()>) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            while events.recv().await.is_some() {
                let changed = session.soft_fetch().await;
                debug!("Focus refresh for session {} (changed={})", session.id(), changed);
            }
        })
    }

    fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    fn store(&self) -> &StateStore {
        self.inner.orchestrator.store()
    }
}

/// Builder wiring a session to its collaborators
pub struct SessionBuilder {
    scope: PipelineScope,
    cache: Option<Arc<dyn CacheStore>>,
    pipelines: Option<Arc<dyn PipelineRepository>>,
    templates: Option<Arc<dyn TemplateRepository>>,
    reconciliation: Option<Arc<dyn ReconcileRepository>>,
}

impl SessionBuilder {
    fn new(scope: PipelineScope) -> Self {
        Self {
            scope,
            cache: None,
            pipelines: None,
            templates: None,
            reconciliation: None,
        }
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn pipelines(mut self, pipelines: Arc<dyn PipelineRepository>) -> Self {
        self.pipelines = Some(pipelines);
        self
    }

    pub fn templates(mut self, templates: Arc<dyn TemplateRepository>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn reconciliation(mut self, reconciliation: Arc<dyn ReconcileRepository>) -> Self {
        self.reconciliation = Some(reconciliation);
        self
    }

    /// Uses one HTTP client for every remote collaborator
    pub fn client(self, client: OrchestratorClient) -> Self {
        let client = Arc::new(client);
        self.pipelines(client.clone())
            .templates(client.clone())
            .reconciliation(client)
    }

    /// Validates the scope and creates the session
    pub fn build(self) -> Result<Session, SessionError> {
        self.scope.validate()?;
        let cache = self.cache.ok_or(SessionError::MissingCollaborator("cache"))?;
        let pipelines = self
            .pipelines
            .ok_or(SessionError::MissingCollaborator("pipeline repository"))?;
        let templates = self
            .templates
            .ok_or(SessionError::MissingCollaborator("template repository"))?;
        let reconciliation = self
            .reconciliation
            .ok_or(SessionError::MissingCollaborator("reconciliation repository"))?;

        let store = StateStore::new(SessionState::new(self.scope));
        let orchestrator = Orchestrator::new(store, cache, pipelines, templates);
        let session = Session {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                orchestrator,
                reconciler: Reconciler::new(reconciliation),
            }),
        };

        session.dispatch(Action::Initialize);
        debug!("Session {} initialized for {}", session.id(), session.identity_key());
        Ok(session)
    }
}
