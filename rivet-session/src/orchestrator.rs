//! Async action orchestrator
//!
//! Coordinator routines that perform I/O (remote fetch and save, cache reads and
//! writes, template resolution) and dispatch actions into the reducer at each decision
//! point.
//!
//! Ordering rules every routine follows:
//! - cache deletion under an old key completes before a record is created under a new
//!   key for the same session
//! - an action describing a write is dispatched only after that write settled; direct
//!   user edits are the exception and are dispatched first, their write queued behind
//!   the session's earlier cache operations
//! - every cache read waits for the session's queued writes and deletes
//! - cache failures are logged and never abort a routine; the in-memory state stays the
//!   source of truth
//! - a fetch that was superseded or aborted dispatches nothing after it notices

use chrono::Utc;
use rivet_core::compare::documents_equal;
use rivet_core::domain::pipeline::{GitDetails, PipelineDocument, StoreMetadata, merge_git_details};
use rivet_core::domain::scope::PipelineScope;
use rivet_core::domain::template::{TemplateTypes, template_refs};
use rivet_core::dto::pipeline::{FetchedPipeline, SavePipeline};
use rivet_core::identity::{IdentityKey, derive_key};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::{Action, DocumentMetadata, FetchSuccessPayload, RestorePayload, SaveSuccessPayload};
use crate::cache::{CacheRecord, CacheStore, CacheWriter};
use crate::error::FetchFailure;
use crate::reducer::reduce;
use crate::repository::{PipelineRepository, TemplateRepository};
use crate::store::StateStore;

/// Options for one fetch
#[derive(Debug, Clone, Default)]
pub struct FetchParams {
    /// Replace cached unsaved edits with the remote document
    pub force_fetch: bool,
    /// Fetch this branch instead of the session's
    ///
    /// Scope overrides move the session: once the fetch succeeds, the record cached under
    /// the previous scope is deleted before the new one is written, as with a scope switch.
    pub branch: Option<String>,
    /// Fetch from this repository instead of the session's
    pub repo_name: Option<String>,
    pub repo_identifier: Option<String>,
    /// Caller-owned abort signal; cancelling it turns the fetch into a no-op
    ///
    /// Nothing is dispatched after the abort, so the state keeps what `FetchStart` set:
    /// `is_loading` stays true and `is_updated` stays false until the next fetch settles,
    /// even when the session holds unsaved edits.
    pub signal: Option<CancellationToken>,
}

impl FetchParams {
    pub fn forced() -> Self {
        Self {
            force_fetch: true,
            ..Default::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    fn scope_for(&self, current: &PipelineScope) -> PipelineScope {
        let mut scope = current.clone();
        if let Some(branch) = &self.branch {
            scope.branch = Some(branch.clone());
        }
        if let Some(repo_name) = &self.repo_name {
            scope.repo_name = Some(repo_name.clone());
        }
        if let Some(repo_identifier) = &self.repo_identifier {
            scope.repo_identifier = Some(repo_identifier.clone());
        }
        scope
    }
}

/// How a fetch ended
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The remote document replaced the session's documents
    Fetched,
    /// Unsaved edits from the cache were kept; the remote document became the backend snapshot
    RestoredFromCache,
    /// The remote call failed; the failure is on the state
    Failed(FetchFailure),
    /// A newer fetch or the caller's signal cancelled this one; nothing was dispatched
    Cancelled,
}

/// A change to the edited document
pub enum DocumentUpdate {
    /// Replace the document
    Replace(PipelineDocument),
    /// Derive the document from the most recently cached one
    Produce(Box<dyn FnOnce(&PipelineDocument) -> PipelineDocument + Send>),
}

impl DocumentUpdate {
    pub fn produce(f: impl FnOnce(&PipelineDocument) -> PipelineDocument + Send + 'static) -> Self {
        DocumentUpdate::Produce(Box::new(f))
    }

    fn apply(self, base: &PipelineDocument) -> PipelineDocument {
        match self {
            DocumentUpdate::Replace(document) => document,
            DocumentUpdate::Produce(producer) => producer(base),
        }
    }
}

/// A new storage association for the session
#[derive(Debug, Clone)]
pub enum ScopeAssociation {
    Git(GitDetails),
    Store(StoreMetadata),
}

impl ScopeAssociation {
    fn into_action(self) -> Action {
        match self {
            ScopeAssociation::Git(git) => Action::UpdateGitDetails(git),
            ScopeAssociation::Store(meta) => Action::UpdateStoreMetadata(meta),
        }
    }
}

/// Options for a save
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    pub commit_message: Option<String>,
}

/// How a save ended
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved,
    /// The base version moved; the user must choose between overwrite and reload
    Conflict(FetchFailure),
    Failed(FetchFailure),
}

struct InFlightFetch {
    generation: u64,
    token: CancellationToken,
}

/// Coordinator of all I/O performed on behalf of one session
pub(crate) struct Orchestrator {
    store: StateStore,
    cache: CacheWriter,
    pipelines: Arc<dyn PipelineRepository>,
    templates: Arc<dyn TemplateRepository>,
    in_flight: Mutex<Option<InFlightFetch>>,
    generation: AtomicU64,
}

impl Orchestrator {
    pub(crate) fn new(
        store: StateStore,
        cache: Arc<dyn CacheStore>,
        pipelines: Arc<dyn PipelineRepository>,
        templates: Arc<dyn TemplateRepository>,
    ) -> Self {
        Self {
            store,
            cache: CacheWriter::new(cache),
            pipelines,
            templates,
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn store(&self) -> &StateStore {
        &self.store
    }

    // =============================================================================
    // Fetch
    // =============================================================================

    /// Fetches the pipeline for the session's scope (with `params` overrides)
    ///
    /// Starting a fetch cancels the one in flight, if any.
    pub(crate) async fn fetch_pipeline(&self, params: FetchParams) -> FetchOutcome {
        let (generation, token) = self.begin_fetch(params.signal.as_ref());
        let (scope, previous_key) = self
            .store
            .read(|s| (params.scope_for(&s.scope), s.identity_key()));
        let key = derive_key(&scope);

        info!("Fetching pipeline {} (force={})", key, params.force_fetch);
        self.store.dispatch(Action::FetchStart);

        let fetched = match cancellable(&token, self.pipelines.fetch_document(&scope)).await {
            None => return self.cancelled(generation, &key),
            Some(Ok(fetched)) => fetched,
            Some(Err(err)) => {
                let failure = FetchFailure::from_client_error(&err);
                warn!("Fetching pipeline {} failed: {}", key, failure);
                self.store.dispatch(Action::FetchError {
                    error: Some(failure.clone()),
                    template_error: None,
                });
                self.finish_fetch(generation);
                return FetchOutcome::Failed(failure);
            }
        };

        let FetchedPipeline {
            document,
            git_details,
            store_metadata,
            entity_validity_details,
            template_schema_errors,
        } = fetched;

        // Read only after the remote call returns; other sessions may have written meanwhile.
        let cached = self.read_cache(&key).await;
        if token.is_cancelled() {
            return self.cancelled(generation, &key);
        }

        let keep_edits =
            !params.force_fetch && cached.as_ref().is_some_and(CacheRecord::has_unsaved_changes);
        let (pipeline, original_pipeline) = match &cached {
            Some(record) if keep_edits => {
                info!("Keeping unsaved edits cached under {}", key);
                (record.pipeline.clone(), record.original_pipeline.clone())
            }
            _ => (document.clone(), document.clone()),
        };

        // Fetched values win; the cache only supplies what the response omits.
        let git_details =
            merge_git_details(git_details, cached.as_ref().and_then(|r| r.git_details.as_ref()));
        let store_metadata =
            store_metadata.or_else(|| cached.as_ref().and_then(|r| r.store_metadata.clone()));
        let entity_validity_details = entity_validity_details
            .or_else(|| cached.as_ref().map(|r| r.entity_validity_details.clone()))
            .unwrap_or_default();

        let Some((template_types, template_error)) = self
            .resolve_templates(&pipeline, &scope, &token, cached.as_ref())
            .await
        else {
            return self.cancelled(generation, &key);
        };

        let metadata = DocumentMetadata {
            git_details,
            store_metadata,
            entity_validity_details,
            template_types,
            template_schema_errors,
            template_error,
        };

        let record = CacheRecord {
            identity_key: key.clone(),
            pipeline: pipeline.clone(),
            original_pipeline: original_pipeline.clone(),
            git_details: metadata.git_details.clone(),
            store_metadata: metadata.store_metadata.clone(),
            entity_validity_details: metadata.entity_validity_details.clone(),
            template_types: metadata.template_types.clone(),
            template_schema_errors: metadata.template_schema_errors.clone(),
            cached_at: Utc::now(),
        };

        if token.is_cancelled() {
            return self.cancelled(generation, &key);
        }
        if key != previous_key {
            info!("Fetch moves session {} -> {}", previous_key, key);
            self.remove_cache(&previous_key).await;
        }
        self.write_cache(record).await;
        if token.is_cancelled() {
            return self.cancelled(generation, &key);
        }

        let outcome = if keep_edits {
            self.store
                .dispatch(Action::RestoreFromCache(Box::new(RestorePayload {
                    scope,
                    pipeline,
                    original_pipeline,
                    backend_pipeline: document,
                    metadata,
                })));
            FetchOutcome::RestoredFromCache
        } else {
            self.store
                .dispatch(Action::FetchSuccess(Box::new(FetchSuccessPayload {
                    scope,
                    pipeline,
                    metadata,
                })));
            FetchOutcome::Fetched
        };

        self.finish_fetch(generation);
        outcome
    }

    /// Cancels the fetch in flight; returns false when there was none
    pub(crate) fn cancel_fetch(&self) -> bool {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.take() {
            Some(fetch) => {
                fetch.token.cancel();
                true
            }
            None => false,
        }
    }

    fn begin_fetch(&self, signal: Option<&CancellationToken>) -> (u64, CancellationToken) {
        let token = signal
            .map(CancellationToken::child_token)
            .unwrap_or_else(CancellationToken::new);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(InFlightFetch {
            generation,
            token: token.clone(),
        }) {
            debug!("Fetch #{} supersedes fetch #{}", generation, previous.generation);
            previous.token.cancel();
        }
        (generation, token)
    }

    fn finish_fetch(&self, generation: u64) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|f| f.generation == generation) {
            *slot = None;
        }
    }

    fn cancelled(&self, generation: u64, key: &IdentityKey) -> FetchOutcome {
        debug!("Fetch #{} for {} was cancelled", generation, key);
        self.finish_fetch(generation);
        FetchOutcome::Cancelled
    }

    /// Resolves template types for `document`
    ///
    /// Returns `None` when cancelled. A resolver failure is not fatal: the cached types
    /// are kept and the failure becomes the template error.
    async fn resolve_templates(
        &self,
        document: &PipelineDocument,
        scope: &PipelineScope,
        token: &CancellationToken,
        cached: Option<&CacheRecord>,
    ) -> Option<(TemplateTypes, Option<String>)> {
        let refs = template_refs(document);
        if refs.is_empty() {
            return Some((TemplateTypes::default(), None));
        }

        debug!("Resolving {} template reference(s)", refs.len());
        match cancellable(token, self.templates.resolve_template_types(refs, scope)).await {
            None => None,
            Some(Ok(types)) => Some((types, None)),
            Some(Err(err)) => {
                warn!("Resolving template types failed: {}", err);
                let fallback = cached.map(|r| r.template_types.clone()).unwrap_or_default();
                Some((fallback, Some(err.to_string())))
            }
        }
    }

    // =============================================================================
    // Cache-only refresh
    // =============================================================================

    /// Pulls in a document another session wrote to the cache
    ///
    /// Never touches the remote service and never overwrites unsaved local edits.
    /// Returns true when the state was updated.
    pub(crate) async fn soft_fetch(&self) -> bool {
        let key = self.store.read(|s| s.identity_key());
        let Some(record) = self.read_cache(&key).await else {
            return false;
        };

        let (current_key, has_edits, differs_from_current, differs_from_original) =
            self.store.read(|s| {
                (
                    s.identity_key(),
                    s.has_unsaved_changes(),
                    !documents_equal(&record.pipeline, &s.pipeline),
                    !documents_equal(&record.pipeline, &s.original_pipeline),
                )
            });

        if current_key != key {
            debug!("Scope moved during soft fetch of {}; ignoring", key);
            return false;
        }
        if has_edits {
            debug!("Soft fetch of {} skipped: unsaved local edits", key);
            return false;
        }
        if !differs_from_current || !differs_from_original {
            return false;
        }

        info!("Soft fetch picked up an external change under {}", key);
        self.store.dispatch(Action::update_pipeline(record.pipeline));
        true
    }

    // =============================================================================
    // Edits
    // =============================================================================

    /// Applies a direct user edit
    ///
    /// The state changes immediately. The cache write is queued behind the session's
    /// earlier cache operations; the receiver resolves to whether it succeeded, and a
    /// failure is only logged.
    pub(crate) fn update_pipeline(&self, document: PipelineDocument) -> oneshot::Receiver<bool> {
        self.store.dispatch(Action::update_pipeline(document));
        let record = self.store.read(|s| CacheRecord::from_state(s, Utc::now()));
        self.cache.enqueue_put(record)
    }

    /// Applies an edit on top of the cached document, persisting before dispatching
    ///
    /// Returns the recomputed `is_updated`, or `None` when the scope moved while the base
    /// was read and the edit was dropped.
    pub(crate) async fn update_document(&self, update: DocumentUpdate) -> Option<bool> {
        let key = self.store.read(|s| s.identity_key());
        let base = match self.read_cache(&key).await {
            Some(record) => record.pipeline,
            None => self.store.read(|s| s.pipeline.clone()),
        };

        let action = Action::update_pipeline(update.apply(&base));
        let next = reduce(self.store.snapshot(), action.clone());
        if next.identity_key() != key {
            warn!("Scope moved while updating {}; edit dropped", key);
            return None;
        }

        self.write_cache(CacheRecord::from_state(&next, Utc::now())).await;
        self.store.dispatch(action);
        Some(self.store.read(|s| s.is_updated))
    }

    // =============================================================================
    // Scope changes
    // =============================================================================

    /// Re-associates the session with new git details or store metadata
    ///
    /// The record under the old key is deleted before the record under the new key is
    /// written.
    pub(crate) async fn update_scope_association(&self, change: ScopeAssociation) {
        let old_key = self.store.read(|s| s.identity_key());
        let action = change.into_action();
        let next = reduce(self.store.snapshot(), action.clone());
        info!("Moving session {} -> {}", old_key, next.identity_key());

        self.remove_cache(&old_key).await;
        self.write_cache(CacheRecord::from_state(&next, Utc::now())).await;
        self.store.dispatch(action);
    }

    /// Moves the session to another scope and fetches it
    ///
    /// The record of the abandoned scope is deleted first.
    pub(crate) async fn switch_scope(&self, scope: PipelineScope, force_fetch: bool) -> FetchOutcome {
        self.cancel_fetch();
        let old_key = self.store.read(|s| s.identity_key());
        if derive_key(&scope) != old_key {
            self.remove_cache(&old_key).await;
        }

        self.store.dispatch(Action::SetScope(scope));
        self.fetch_pipeline(FetchParams {
            force_fetch,
            ..Default::default()
        })
        .await
    }

    /// Deletes the cache record addressed by `scope`
    pub(crate) async fn delete_session_cache(&self, scope: &PipelineScope) -> bool {
        self.remove_cache(&derive_key(scope)).await
    }

    /// Drops unsaved edits, both cached and in memory
    pub(crate) async fn discard(&self) {
        let key = self.store.read(|s| s.identity_key());
        info!("Discarding unsaved changes for {}", key);
        self.remove_cache(&key).await;
        self.store.dispatch(Action::DiscardChanges);
    }

    // =============================================================================
    // Save
    // =============================================================================

    /// Publishes the edited document
    ///
    /// On success the cache record is deleted and the saved document becomes the new
    /// original. A conflict is recorded and left for the user to decide.
    pub(crate) async fn save(&self, options: SaveOptions) -> SaveOutcome {
        let (key, req) = self.store.read(|s| {
            (
                s.identity_key(),
                SavePipeline {
                    scope: s.scope.clone(),
                    document: s.pipeline.clone(),
                    git_details: s.git_details.clone(),
                    base_object_id: s.git_details.as_ref().and_then(|g| g.object_id.clone()),
                    commit_message: options.commit_message.clone(),
                },
            )
        });
        let submitted = req.document.clone();

        self.store.dispatch(Action::SaveStart);
        match self.pipelines.save_document(req).await {
            Ok(result) => {
                self.remove_cache(&key).await;
                self.store
                    .dispatch(Action::SaveSuccess(Box::new(SaveSuccessPayload {
                        saved: result.document.unwrap_or_else(|| submitted.clone()),
                        submitted,
                        git_details: result.git_details,
                    })));
                info!("Saved pipeline {}", key);
                SaveOutcome::Saved
            }
            Err(err) => {
                let failure = FetchFailure::from_client_error(&err);
                warn!("Saving pipeline {} failed: {}", key, failure);
                self.store.dispatch(Action::SaveError(failure.clone()));
                if failure.is_conflict() {
                    SaveOutcome::Conflict(failure)
                } else {
                    SaveOutcome::Failed(failure)
                }
            }
        }
    }

    // =============================================================================
    // Cache access
    // =============================================================================

    async fn read_cache(&self, key: &IdentityKey) -> Option<CacheRecord> {
        self.cache.get(key).await
    }

    async fn write_cache(&self, record: CacheRecord) -> bool {
        self.cache.put(record).await
    }

    async fn remove_cache(&self, key: &IdentityKey) -> bool {
        self.cache.delete(key).await
    }
}

/// Runs `fut` unless `token` is cancelled first
async fn cancellable<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = fut => Some(output),
    }
}
