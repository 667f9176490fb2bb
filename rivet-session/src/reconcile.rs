//! Reconciliation
//!
//! Asks the reconciliation service whether the edited document still matches its fully
//! template-expanded form. Drift is only reported; the canonical document replaces the
//! edited one only when the user asks for it.

use rivet_core::compare::differences;
use rivet_core::dto::reconcile::DriftReport;
use std::sync::Arc;
use tracing::{info, warn};

use crate::action::Action;
use crate::error::FetchFailure;
use crate::orchestrator::{DocumentUpdate, Orchestrator};
use crate::repository::ReconcileRepository;
use crate::state::{DriftDetails, ReconcileStatus};

/// How a reconciliation ended
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    InSync,
    OutOfSync(DriftDetails),
    Failed(FetchFailure),
}

impl ReconcileOutcome {
    pub fn out_of_sync(&self) -> bool {
        matches!(self, ReconcileOutcome::OutOfSync(_))
    }

    pub fn details(&self) -> Option<&DriftDetails> {
        match self {
            ReconcileOutcome::OutOfSync(details) => Some(details),
            _ => None,
        }
    }
}

pub(crate) struct Reconciler {
    api: Arc<dyn ReconcileRepository>,
}

impl Reconciler {
    pub(crate) fn new(api: Arc<dyn ReconcileRepository>) -> Self {
        Self { api }
    }

    pub(crate) async fn reconcile(&self, orchestrator: &Orchestrator) -> ReconcileOutcome {
        let store = orchestrator.store();
        let (scope, document) = store.read(|s| (s.scope.clone(), s.pipeline.clone()));

        store.dispatch(Action::ReconcileStart);
        let report = match self.api.compute_drift(&document, &scope).await {
            Ok(report) => report,
            Err(err) => {
                let failure = FetchFailure::from_client_error(&err);
                warn!("Reconciliation failed: {}", failure);
                store.dispatch(Action::ReconcileError(failure.message.clone()));
                return ReconcileOutcome::Failed(failure);
            }
        };

        let DriftReport {
            out_of_sync,
            canonical_document,
            diff_summary,
        } = report;

        if !out_of_sync {
            store.dispatch(Action::ReconcileSuccess(None));
            return ReconcileOutcome::InSync;
        }

        let paths = canonical_document
            .as_ref()
            .map(|canonical| differences(&document, canonical))
            .unwrap_or_default();
        info!("Pipeline is out of sync ({} differing path(s))", paths.len());

        let details = DriftDetails {
            summary: diff_summary,
            paths,
            canonical: canonical_document,
        };
        store.dispatch(Action::ReconcileSuccess(Some(details.clone())));
        ReconcileOutcome::OutOfSync(details)
    }

    /// Replaces the edited document with the canonical one from the last reconciliation
    ///
    /// Returns false when there is nothing to apply or the scope moved before the
    /// document could be applied.
    pub(crate) async fn refresh_from_canonical(&self, orchestrator: &Orchestrator) -> bool {
        let canonical = orchestrator.store().read(|s| match &s.reconcile_status {
            ReconcileStatus::OutOfSync(details) => details.canonical.clone(),
            _ => None,
        });
        let Some(canonical) = canonical else {
            return false;
        };

        if orchestrator
            .update_document(DocumentUpdate::Replace(canonical))
            .await
            .is_none()
        {
            warn!("Canonical document not applied; the scope moved");
            return false;
        }
        orchestrator.store().dispatch(Action::ReconcileApplied);
        true
    }
}
