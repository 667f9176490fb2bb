//! Session reducer
//!
//! Pure function computing the next session state from the current state and an
//! action. It performs no I/O, reads no clock and draws no randomness, so every
//! transition can be tested by value.
//!
//! Derived flags (`is_updated`, `is_backend_updated`) are recomputed from the documents
//! by every transition that touches a document; a previous snapshot's booleans are
//! never carried over.

use rivet_core::compare::documents_equal;
use rivet_core::domain::pipeline::merge_git_details;

use crate::action::{Action, DocumentMetadata};
use crate::state::{ReconcileStatus, SessionState};

/// Applies one action to the state
pub fn reduce(mut state: SessionState, action: Action) -> SessionState {
    match action {
        Action::Initialize => {
            state.is_initialized = true;
        }

        Action::FetchStart => {
            state.is_loading = true;
            state.is_updated = false;
            state.is_backend_updated = false;
        }

        Action::FetchSuccess(payload) => {
            let payload = *payload;
            state.scope = payload.scope;
            state.original_pipeline = payload.pipeline.clone();
            state.backend_pipeline = Some(payload.pipeline.clone());
            state.pipeline = payload.pipeline;
            apply_metadata(&mut state, payload.metadata);
            state.is_loading = false;
            state.remote_fetch_error = None;
            state.refresh_flags();
        }

        Action::RestoreFromCache(payload) => {
            let payload = *payload;
            state.scope = payload.scope;
            state.pipeline = payload.pipeline;
            state.original_pipeline = payload.original_pipeline;
            state.backend_pipeline = Some(payload.backend_pipeline);
            apply_metadata(&mut state, payload.metadata);
            state.is_loading = false;
            state.remote_fetch_error = None;
            state.refresh_flags();
        }

        Action::FetchError {
            error,
            template_error,
        } => {
            // The document keeps its previous value; the editor must not go blank.
            state.remote_fetch_error = error;
            if template_error.is_some() {
                state.template_error = template_error;
            }
            state.is_loading = false;
            state.refresh_flags();
        }

        Action::UpdatePipeline(document) => {
            state.pipeline = *document;
            state.refresh_flags();
        }

        Action::UpdateSelection(selection) => {
            state.selection = selection;
        }

        Action::SetScope(scope) => {
            state.scope = scope;
        }

        Action::UpdateGitDetails(git_details) => {
            state.scope = state.scope.with_git_details(&git_details);
            state.git_details = Some(git_details);
        }

        Action::UpdateStoreMetadata(store_metadata) => {
            state.scope = state.scope.with_store_metadata(&store_metadata);
            state.store_metadata = Some(store_metadata);
        }

        Action::UpdateEntityValidity(validity) => {
            state.entity_validity_details = validity;
        }

        Action::SetTemplateTypes(template_types) => {
            state.template_types = template_types;
        }

        Action::SetTemplateError(template_error) => {
            state.template_error = template_error;
        }

        Action::SaveStart => {
            state.is_saving = true;
            state.save_error = None;
        }

        Action::SaveSuccess(payload) => {
            let payload = *payload;
            // Edits made while the save was in flight survive it.
            if documents_equal(&state.pipeline, &payload.submitted) {
                state.pipeline = payload.saved.clone();
            }
            state.original_pipeline = payload.saved.clone();
            state.backend_pipeline = Some(payload.saved);
            state.git_details = merge_git_details(payload.git_details, state.git_details.as_ref());
            state.is_saving = false;
            state.save_error = None;
            state.refresh_flags();
        }

        Action::SaveError(error) => {
            state.is_saving = false;
            state.save_error = Some(error);
        }

        Action::DiscardChanges => {
            state.pipeline = state.original_pipeline.clone();
            state.reconcile_status = ReconcileStatus::Idle;
            state.save_error = None;
            state.refresh_flags();
        }

        Action::ReconcileStart => {
            state.reconcile_status = ReconcileStatus::InProgress;
        }

        Action::ReconcileSuccess(drift) => {
            state.reconcile_status = match drift {
                Some(details) => ReconcileStatus::OutOfSync(details),
                None => ReconcileStatus::InSync,
            };
        }

        Action::ReconcileError(message) => {
            state.reconcile_status = ReconcileStatus::Failed(message);
        }

        Action::ReconcileApplied => {
            state.reconcile_status = ReconcileStatus::InSync;
        }
    }

    state
}

fn apply_metadata(state: &mut SessionState, metadata: DocumentMetadata) {
    state.git_details = metadata.git_details;
    state.store_metadata = metadata.store_metadata;
    state.entity_validity_details = metadata.entity_validity_details;
    state.template_types = metadata.template_types;
    state.template_schema_errors = metadata.template_schema_errors;
    state.template_error = metadata.template_error;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{FetchSuccessPayload, RestorePayload, SaveSuccessPayload};
    use crate::error::{FetchErrorKind, FetchFailure};
    use crate::state::Selection;
    use rivet_core::domain::pipeline::{GitDetails, PipelineDocument};
    use rivet_core::domain::scope::PipelineScope;
    use serde_json::json;

    fn scope() -> PipelineScope {
        PipelineScope::new("acct", "org", "proj", "p1")
            .with_repo_name("repoA")
            .with_branch("main")
    }

    fn doc(stage: &str) -> PipelineDocument {
        PipelineDocument::new("p1", "Build")
            .with_scope("org", "proj")
            .with_body(json!({ "stages": [{ "name": stage }] }))
    }

    fn fetched(stage: &str) -> Action {
        Action::FetchSuccess(Box::new(FetchSuccessPayload {
            scope: scope(),
            pipeline: doc(stage),
            metadata: DocumentMetadata::default(),
        }))
    }

    fn loaded(stage: &str) -> SessionState {
        reduce(SessionState::new(scope()), fetched(stage))
    }

    #[test]
    fn test_initialize() {
        let state = reduce(SessionState::new(scope()), Action::Initialize);
        assert!(state.is_initialized);
    }

    #[test]
    fn test_fetch_start_sets_loading_and_clears_flags() {
        let mut state = loaded("build");
        state = reduce(state, Action::update_pipeline(doc("edited")));
        assert!(state.is_updated);

        let state = reduce(state, Action::FetchStart);
        assert!(state.is_loading);
        assert!(!state.is_updated);
        assert!(!state.is_backend_updated);
    }

    #[test]
    fn test_fetch_success_synchronizes_documents() {
        let state = reduce(loaded("old"), Action::FetchStart);
        let state = reduce(state, fetched("build"));

        assert!(!state.is_loading);
        assert!(!state.is_updated);
        assert!(!state.is_backend_updated);
        assert!(documents_equal(&state.original_pipeline, &state.pipeline));
        assert!(documents_equal(&state.pipeline, &doc("build")));
    }

    #[test]
    fn test_fetch_error_keeps_document() {
        let before = loaded("build");
        let state = reduce(before.clone(), Action::FetchStart);
        let state = reduce(
            state,
            Action::FetchError {
                error: Some(FetchFailure::new(FetchErrorKind::Transient, "timeout")),
                template_error: None,
            },
        );

        assert!(!state.is_loading);
        assert_eq!(
            state.remote_fetch_error.as_ref().map(|e| e.kind),
            Some(FetchErrorKind::Transient)
        );
        assert!(documents_equal(&state.pipeline, &before.pipeline));
    }

    #[test]
    fn test_fetch_error_restores_derived_flags() {
        let state = reduce(loaded("build"), Action::update_pipeline(doc("edited")));
        let state = reduce(state, Action::FetchStart);
        let state = reduce(
            state,
            Action::FetchError {
                error: Some(FetchFailure::new(FetchErrorKind::Transient, "timeout")),
                template_error: None,
            },
        );
        assert!(state.is_updated);
    }

    #[test]
    fn test_update_pipeline_tracks_edits_and_reverts() {
        let state = loaded("build");
        let original = state.original_pipeline.clone();

        let state = reduce(state, Action::update_pipeline(doc("deploy")));
        assert!(state.is_updated);

        let state = reduce(state, Action::update_pipeline(original));
        assert!(!state.is_updated);
    }

    #[test]
    fn test_update_selection_is_idempotent() {
        let selection = Selection::step("build", "compile");
        let once = reduce(loaded("build"), Action::UpdateSelection(selection.clone()));
        let twice = reduce(once.clone(), Action::UpdateSelection(selection.clone()));

        assert_eq!(once.selection, selection);
        assert_eq!(twice.selection, once.selection);
        assert!(documents_equal(&twice.pipeline, &once.pipeline));
        assert_eq!(twice.is_updated, once.is_updated);
    }

    #[test]
    fn test_set_scope_only_replaces_scope() {
        let state = loaded("build");
        let dev = scope().with_branch("dev");
        let next = reduce(state.clone(), Action::SetScope(dev.clone()));

        assert_eq!(next.scope, dev);
        assert!(documents_equal(&next.pipeline, &state.pipeline));
        assert!(!next.is_loading);
    }

    #[test]
    fn test_restore_from_cache_keeps_edits_and_flags_backend_drift() {
        let state = reduce(SessionState::new(scope()), Action::FetchStart);
        let state = reduce(
            state,
            Action::RestoreFromCache(Box::new(RestorePayload {
                scope: scope(),
                pipeline: doc("edited"),
                original_pipeline: doc("build"),
                backend_pipeline: doc("pushed-elsewhere"),
                metadata: DocumentMetadata::default(),
            })),
        );

        assert!(state.is_updated);
        assert!(state.is_backend_updated);
        assert!(documents_equal(&state.pipeline, &doc("edited")));
    }

    #[test]
    fn test_update_git_details_moves_scope() {
        let git = GitDetails {
            repo_name: Some("repoA".to_string()),
            branch: Some("feature".to_string()),
            object_id: Some("abc".to_string()),
            ..Default::default()
        };
        let state = reduce(loaded("build"), Action::UpdateGitDetails(git.clone()));

        assert_eq!(state.scope.branch.as_deref(), Some("feature"));
        assert_eq!(state.git_details, Some(git));
    }

    #[test]
    fn test_save_success_resets_original_and_keeps_in_flight_edits() {
        let state = reduce(loaded("build"), Action::update_pipeline(doc("deploy")));
        let state = reduce(state, Action::SaveStart);
        assert!(state.is_saving);

        let saved = reduce(
            state.clone(),
            Action::SaveSuccess(Box::new(SaveSuccessPayload {
                submitted: doc("deploy"),
                saved: doc("deploy"),
                git_details: None,
            })),
        );
        assert!(!saved.is_saving);
        assert!(!saved.is_updated);

        let edited_meanwhile = reduce(state, Action::update_pipeline(doc("later")));
        let saved = reduce(
            edited_meanwhile,
            Action::SaveSuccess(Box::new(SaveSuccessPayload {
                submitted: doc("deploy"),
                saved: doc("deploy"),
                git_details: None,
            })),
        );
        assert!(saved.is_updated);
        assert!(documents_equal(&saved.pipeline, &doc("later")));
    }

    #[test]
    fn test_save_error_records_conflict() {
        let state = reduce(loaded("build"), Action::SaveStart);
        let state = reduce(
            state,
            Action::SaveError(FetchFailure::new(FetchErrorKind::Conflict, "base moved")),
        );
        assert!(!state.is_saving);
        assert!(state.save_error.as_ref().is_some_and(|e| e.is_conflict()));
    }

    #[test]
    fn test_discard_restores_original() {
        let state = reduce(loaded("build"), Action::update_pipeline(doc("deploy")));
        let state = reduce(state, Action::DiscardChanges);
        assert!(!state.is_updated);
        assert!(documents_equal(&state.pipeline, &doc("build")));
    }

    #[test]
    fn test_reconcile_transitions() {
        let state = reduce(loaded("build"), Action::ReconcileStart);
        assert_eq!(state.reconcile_status, ReconcileStatus::InProgress);

        let state = reduce(state, Action::ReconcileSuccess(None));
        assert_eq!(state.reconcile_status, ReconcileStatus::InSync);

        let state = reduce(state, Action::ReconcileError("service down".to_string()));
        assert_eq!(
            state.reconcile_status,
            ReconcileStatus::Failed("service down".to_string())
        );
    }
}
