//! Fake collaborators shared by the session tests

#![allow(dead_code)]

use async_trait::async_trait;
use rivet_client::ClientError;
use rivet_core::domain::pipeline::{GitDetails, PipelineDocument};
use rivet_core::domain::scope::PipelineScope;
use rivet_core::domain::template::TemplateTypes;
use rivet_core::dto::pipeline::{FetchedPipeline, SavePipeline, SaveResult};
use rivet_core::dto::reconcile::DriftReport;
use rivet_core::identity::IdentityKey;
use rivet_session::repository::{PipelineRepository, ReconcileRepository, TemplateRepository};
use rivet_session::{
    CacheError, CacheRecord, CacheStore, InMemoryCacheStore, Session,
};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub fn scope(branch: &str) -> PipelineScope {
    PipelineScope::new("acct", "org", "proj", "p1")
        .with_repo_name("repoA")
        .with_branch(branch)
}

pub fn doc(stage: &str) -> PipelineDocument {
    PipelineDocument::new("p1", "Build")
        .with_scope("org", "proj")
        .with_body(json!({ "stages": [{ "stage": { "name": stage } }] }))
}

pub fn git(branch: &str, object_id: &str) -> GitDetails {
    GitDetails {
        repo_name: Some("repoA".to_string()),
        branch: Some(branch.to_string()),
        object_id: Some(object_id.to_string()),
        ..Default::default()
    }
}

/// In-process stand-in for the authoring, template and reconciliation services
#[derive(Default)]
pub struct FakeService {
    documents: Mutex<HashMap<String, FetchedPipeline>>,
    fetch_delays: Mutex<VecDeque<Duration>>,
    fetch_failures: Mutex<VecDeque<ClientError>>,
    save_failure: Mutex<Option<ClientError>>,
    template_failure: Mutex<Option<String>>,
    drift: Mutex<DriftReport>,
    saves: Mutex<Vec<SavePipeline>>,
    fetch_calls: AtomicUsize,
    template_calls: AtomicUsize,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serves `document` for `branch`
    pub fn set_document(&self, branch: &str, document: PipelineDocument) {
        self.set_fetched(branch, FetchedPipeline::new(document));
    }

    pub fn set_fetched(&self, branch: &str, fetched: FetchedPipeline) {
        self.documents
            .lock()
            .unwrap()
            .insert(branch.to_string(), fetched);
    }

    /// Delays the next fetch by `delay`
    pub fn delay_next_fetch(&self, delay: Duration) {
        self.fetch_delays.lock().unwrap().push_back(delay);
    }

    pub fn fail_next_fetch(&self, err: ClientError) {
        self.fetch_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_next_save(&self, err: ClientError) {
        *self.save_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_templates(&self, message: &str) {
        *self.template_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn set_drift(&self, report: DriftReport) {
        *self.drift.lock().unwrap() = report;
    }

    pub fn saves(&self) -> Vec<SavePipeline> {
        self.saves.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn template_calls(&self) -> usize {
        self.template_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineRepository for FakeService {
    async fn fetch_document(&self, scope: &PipelineScope) -> Result<FetchedPipeline, ClientError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        // The response is taken before the delay so a later set_document does not leak in.
        let delay = self.fetch_delays.lock().unwrap().pop_front();
        let failure = self.fetch_failures.lock().unwrap().pop_front();
        let branch = scope.branch.clone().unwrap_or_default();
        let response = self.documents.lock().unwrap().get(&branch).cloned();

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }
        response.ok_or_else(|| ClientError::api_error(404, format!("pipeline not found on {}", branch)))
    }

    async fn save_document(&self, req: SavePipeline) -> Result<SaveResult, ClientError> {
        if let Some(err) = self.save_failure.lock().unwrap().take() {
            return Err(err);
        }
        self.saves.lock().unwrap().push(req.clone());

        let mut git_details = req.git_details.clone().unwrap_or_default();
        git_details.object_id = Some(format!("saved-{}", self.saves.lock().unwrap().len()));
        Ok(SaveResult {
            document: Some(req.document),
            git_details: Some(git_details),
        })
    }
}

#[async_trait]
impl TemplateRepository for FakeService {
    async fn resolve_template_types(
        &self,
        template_refs: Vec<String>,
        _scope: &PipelineScope,
    ) -> Result<TemplateTypes, ClientError> {
        self.template_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.template_failure.lock().unwrap().clone() {
            return Err(ClientError::api_error(422, message));
        }

        let mut types = TemplateTypes::default();
        for reference in template_refs {
            types.types_by_ref.insert(reference, "Stage".to_string());
        }
        Ok(types)
    }
}

#[async_trait]
impl ReconcileRepository for FakeService {
    async fn compute_drift(
        &self,
        _document: &PipelineDocument,
        _scope: &PipelineScope,
    ) -> Result<DriftReport, ClientError> {
        Ok(self.drift.lock().unwrap().clone())
    }
}

/// Cache store whose every operation fails
pub struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &IdentityKey) -> Result<Option<CacheRecord>, CacheError> {
        Err(CacheError::Unavailable("disk unplugged".to_string()))
    }

    async fn put(&self, _record: CacheRecord) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("disk unplugged".to_string()))
    }

    async fn delete(&self, _key: &IdentityKey) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("disk unplugged".to_string()))
    }
}

/// Shared in-memory cache whose writes take `delay` to land
pub struct SlowWrites {
    pub inner: InMemoryCacheStore,
    pub delay: Duration,
}

#[async_trait]
impl CacheStore for SlowWrites {
    async fn get(&self, key: &IdentityKey) -> Result<Option<CacheRecord>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, record: CacheRecord) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(record).await
    }

    async fn delete(&self, key: &IdentityKey) -> Result<(), CacheError> {
        self.inner.delete(key).await
    }
}

/// Shared in-memory cache that can stall one read until released
#[derive(Default)]
pub struct GatedReads {
    pub inner: InMemoryCacheStore,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedReads {
    /// The next `get` waits for [`GatedReads::release`]
    pub fn hold_next_read(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub async fn wait_for_held_read(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl CacheStore for GatedReads {
    async fn get(&self, key: &IdentityKey) -> Result<Option<CacheRecord>, CacheError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.get(key).await
    }

    async fn put(&self, record: CacheRecord) -> Result<(), CacheError> {
        self.inner.put(record).await
    }

    async fn delete(&self, key: &IdentityKey) -> Result<(), CacheError> {
        self.inner.delete(key).await
    }
}

pub fn session_with(
    scope: PipelineScope,
    service: &Arc<FakeService>,
    cache: Arc<dyn CacheStore>,
) -> Session {
    Session::builder(scope)
        .cache(cache)
        .pipelines(service.clone())
        .templates(service.clone())
        .reconciliation(service.clone())
        .build()
        .unwrap()
}

pub fn session(branch: &str, service: &Arc<FakeService>, cache: &InMemoryCacheStore) -> Session {
    session_with(scope(branch), service, Arc::new(cache.clone()))
}
