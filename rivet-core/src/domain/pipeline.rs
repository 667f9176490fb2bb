//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Editable pipeline document
///
/// The structural body (stages, steps, inputs) is opaque to the session engine and
/// kept as JSON. Equality here is strict; use [`crate::compare`] for semantic comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDocument {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub org_identifier: String,
    #[serde(default)]
    pub project_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub body: serde_json::Value,
}

impl PipelineDocument {
    /// Creates an empty document with the given identifier and display name
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            body: serde_json::Value::Object(serde_json::Map::new()),
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, org: impl Into<String>, project: impl Into<String>) -> Self {
        self.org_identifier = org.into();
        self.project_identifier = project.into();
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Git association of a pipeline document
///
/// Presence of `object_id` or `commit_id` marks the document as git-tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

impl GitDetails {
    /// Returns true when the document is backed by a concrete git object
    pub fn is_tracked(&self) -> bool {
        self.object_id.is_some() || self.commit_id.is_some()
    }

    /// Repository identity, preferring the remote repo name over the legacy identifier
    pub fn repository_identity(&self) -> Option<&str> {
        non_empty(self.repo_name.as_deref()).or_else(|| non_empty(self.repo_identifier.as_deref()))
    }

    /// Fills every field the fetched value omits from the cached value
    ///
    /// Freshly fetched values always win; a fetched absence never erases a known
    /// coordinate.
    pub fn fill_missing_from(mut self, cached: &GitDetails) -> Self {
        fill(&mut self.repo_identifier, &cached.repo_identifier);
        fill(&mut self.repo_name, &cached.repo_name);
        fill(&mut self.branch, &cached.branch);
        fill(&mut self.file_path, &cached.file_path);
        fill(&mut self.object_id, &cached.object_id);
        fill(&mut self.commit_id, &cached.commit_id);
        self
    }
}

/// Merges fetched git details with the ones held by the cache
pub fn merge_git_details(
    fetched: Option<GitDetails>,
    cached: Option<&GitDetails>,
) -> Option<GitDetails> {
    match (fetched, cached) {
        (Some(fetched), Some(cached)) => Some(fetched.fill_missing_from(cached)),
        (Some(fetched), None) => Some(fetched),
        (None, cached) => cached.cloned(),
    }
}

fn fill(target: &mut Option<String>, fallback: &Option<String>) {
    if target.is_none() {
        target.clone_from(fallback);
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Where the pipeline document is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreType {
    Inline,
    Remote,
}

/// Storage association of a pipeline document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_type: Option<StoreType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Validity of the stored entity as reported by the authoring service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityValidityDetails {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_yaml: Option<String>,
}

impl Default for EntityValidityDetails {
    fn default() -> Self {
        Self {
            valid: true,
            invalid_yaml: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(branch: &str, object_id: &str) -> GitDetails {
        GitDetails {
            repo_name: Some("repoA".to_string()),
            branch: Some(branch.to_string()),
            object_id: Some(object_id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_repository_identity_prefers_repo_name() {
        let git = GitDetails {
            repo_identifier: Some("legacy".to_string()),
            repo_name: Some("remote".to_string()),
            ..Default::default()
        };
        assert_eq!(git.repository_identity(), Some("remote"));

        let legacy_only = GitDetails {
            repo_identifier: Some("legacy".to_string()),
            repo_name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(legacy_only.repository_identity(), Some("legacy"));
    }

    #[test]
    fn test_merge_fetched_wins_cache_fills_absent() {
        let fetched = GitDetails {
            branch: Some("main".to_string()),
            ..Default::default()
        };
        let cached = tracked("stale", "abc123");

        let merged = merge_git_details(Some(fetched), Some(&cached)).unwrap();
        assert_eq!(merged.branch.as_deref(), Some("main"));
        assert_eq!(merged.object_id.as_deref(), Some("abc123"));
        assert_eq!(merged.repo_name.as_deref(), Some("repoA"));
        assert!(merged.is_tracked());
    }

    #[test]
    fn test_merge_absent_fetch_keeps_cache() {
        let cached = tracked("main", "abc123");
        assert_eq!(merge_git_details(None, Some(&cached)), Some(cached));
        assert_eq!(merge_git_details(None, None), None);
    }

    #[test]
    fn test_document_roundtrips_through_json() {
        let doc = PipelineDocument::new("p1", "Build")
            .with_scope("org", "proj")
            .with_tag("team", "infra")
            .with_body(serde_json::json!({ "stages": [] }));
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("orgIdentifier"));
        let back: PipelineDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
