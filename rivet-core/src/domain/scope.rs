//! Pipeline scope
//!
//! The scope tuple locates one pipeline for one user: account, organization, project,
//! pipeline identifier, and the optional git repository and branch it is read from.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::pipeline::{GitDetails, StoreMetadata};

/// Errors raised by an impossible scope tuple
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A mandatory segment is empty
    #[error("scope segment `{0}` must not be empty")]
    MissingSegment(&'static str),
}

/// Scope of one pipeline editing session
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineScope {
    pub account_id: String,
    pub org_id: String,
    pub project_id: String,
    pub pipeline_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl PipelineScope {
    /// Creates a scope without any git association
    pub fn new(
        account_id: impl Into<String>,
        org_id: impl Into<String>,
        project_id: impl Into<String>,
        pipeline_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            org_id: org_id.into(),
            project_id: project_id.into(),
            pipeline_id: pipeline_id.into(),
            ..Default::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_repo_name(mut self, repo_name: impl Into<String>) -> Self {
        self.repo_name = Some(repo_name.into());
        self
    }

    pub fn with_repo_identifier(mut self, repo_identifier: impl Into<String>) -> Self {
        self.repo_identifier = Some(repo_identifier.into());
        self
    }

    /// Repository identity, preferring the remote repo name over the legacy identifier
    ///
    /// Empty when the scope has no git association.
    pub fn repository_identity(&self) -> &str {
        [self.repo_name.as_deref(), self.repo_identifier.as_deref()]
            .into_iter()
            .flatten()
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }

    /// Branch segment, empty when the scope has no git association
    pub fn branch_segment(&self) -> &str {
        self.branch.as_deref().unwrap_or("")
    }

    /// Returns a copy of this scope re-associated with the given git details
    pub fn with_git_details(&self, git: &GitDetails) -> Self {
        Self {
            repo_identifier: git.repo_identifier.clone(),
            repo_name: git.repo_name.clone(),
            branch: git.branch.clone(),
            ..self.clone()
        }
    }

    /// Returns a copy of this scope re-associated with the given store metadata
    ///
    /// The legacy repo identifier is kept; the remote repo name takes precedence anyway.
    pub fn with_store_metadata(&self, meta: &StoreMetadata) -> Self {
        Self {
            repo_name: meta.repo_name.clone(),
            branch: meta.branch.clone(),
            ..self.clone()
        }
    }

    /// Rejects tuples that cannot address a pipeline
    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.account_id.trim().is_empty() {
            return Err(ScopeError::MissingSegment("account_id"));
        }
        if self.pipeline_id.trim().is_empty() {
            return Err(ScopeError::MissingSegment("pipeline_id"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_identity_normalization() {
        let scope = PipelineScope::new("acct", "org", "proj", "p1")
            .with_repo_identifier("legacy")
            .with_repo_name("remote");
        assert_eq!(scope.repository_identity(), "remote");

        let scope = PipelineScope::new("acct", "org", "proj", "p1").with_repo_identifier("legacy");
        assert_eq!(scope.repository_identity(), "legacy");

        let scope = PipelineScope::new("acct", "org", "proj", "p1");
        assert_eq!(scope.repository_identity(), "");
        assert_eq!(scope.branch_segment(), "");
    }

    #[test]
    fn test_validate_rejects_missing_segments() {
        assert!(PipelineScope::new("acct", "org", "proj", "p1").validate().is_ok());
        assert_eq!(
            PipelineScope::new("", "org", "proj", "p1").validate(),
            Err(ScopeError::MissingSegment("account_id"))
        );
        assert_eq!(
            PipelineScope::new("acct", "org", "proj", " ").validate(),
            Err(ScopeError::MissingSegment("pipeline_id"))
        );
    }

    #[test]
    fn test_with_git_details_replaces_git_segments_only() {
        let scope = PipelineScope::new("acct", "org", "proj", "p1")
            .with_repo_name("repoA")
            .with_branch("main");
        let git = GitDetails {
            repo_name: Some("repoA".to_string()),
            branch: Some("dev".to_string()),
            ..Default::default()
        };

        let moved = scope.with_git_details(&git);
        assert_eq!(moved.branch.as_deref(), Some("dev"));
        assert_eq!(moved.pipeline_id, "p1");
        assert_eq!(moved.account_id, "acct");
    }
}
