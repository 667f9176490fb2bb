//! Identity key derivation
//!
//! Every editing session is cached under one key derived from its scope. The key always
//! carries six segments in a fixed order:
//!
//! `account / org / project / pipeline / repository / branch`
//!
//! Segments are percent-escaped so a `/` inside a value cannot shift a boundary, and the
//! git segments are present even when empty, so an inline pipeline never shares a key
//! with a git-backed copy of itself.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::scope::PipelineScope;

const SEPARATOR: char = '/';

/// Opaque address of one cache record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the cache key for a scope
///
/// The repository segment is normalized (remote repo name before legacy identifier),
/// so two scopes naming the same repository both ways share a key.
pub fn derive_key(scope: &PipelineScope) -> IdentityKey {
    let segments = [
        scope.account_id.as_str(),
        scope.org_id.as_str(),
        scope.project_id.as_str(),
        scope.pipeline_id.as_str(),
        scope.repository_identity(),
        scope.branch_segment(),
    ];

    let mut key = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            key.push(SEPARATOR);
        }
        escape_into(segment, &mut key);
    }
    IdentityKey(key)
}

fn escape_into(segment: &str, out: &mut String) {
    for ch in segment.chars() {
        match ch {
            '%' => out.push_str("%25"),
            SEPARATOR => out.push_str("%2F"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> PipelineScope {
        PipelineScope::new("acct", "org", "proj", "p1")
    }

    #[test]
    fn test_equal_scopes_equal_keys() {
        let a = scope().with_repo_name("repoA").with_branch("main");
        let b = scope().with_repo_name("repoA").with_branch("main");
        assert_eq!(derive_key(&a), derive_key(&b));
    }

    #[test]
    fn test_branch_only_difference_yields_distinct_keys() {
        let main = scope().with_repo_name("repoA").with_branch("main");
        let dev = scope().with_repo_name("repoA").with_branch("dev");
        assert_ne!(derive_key(&main), derive_key(&dev));
    }

    #[test]
    fn test_repo_normalization_collapses_same_repository() {
        let by_name = scope().with_repo_name("repoA").with_branch("main");
        let both = scope()
            .with_repo_identifier("legacy-id")
            .with_repo_name("repoA")
            .with_branch("main");
        assert_eq!(derive_key(&by_name), derive_key(&both));

        let legacy = scope().with_repo_identifier("legacy-id").with_branch("main");
        assert_ne!(derive_key(&by_name), derive_key(&legacy));
    }

    #[test]
    fn test_inline_key_keeps_empty_git_segments() {
        let key = derive_key(&scope());
        assert_eq!(key.as_str(), "acct/org/proj/p1//");

        let git_backed = scope().with_repo_name("repoA");
        assert_ne!(derive_key(&git_backed), key);
    }

    #[test]
    fn test_separator_in_segment_cannot_shift_boundaries() {
        let a = scope().with_repo_name("team/repo").with_branch("main");
        let b = scope().with_repo_name("team").with_branch("repo/main");
        assert_ne!(derive_key(&a), derive_key(&b));
        assert_eq!(derive_key(&a).as_str(), "acct/org/proj/p1/team%2Frepo/main");
    }
}
