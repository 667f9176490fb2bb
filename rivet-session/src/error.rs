//! Error types for the session engine
//!
//! Operational failures (network, storage, templates) never escape the session as
//! `Err`; they are classified into [`FetchFailure`] and stored on the state. The only
//! errors the façade returns are programmer errors.

use rivet_client::ClientError;
use rivet_core::domain::scope::ScopeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned by the session façade
#[derive(Debug, Error)]
pub enum SessionError {
    /// The scope tuple cannot address a pipeline
    #[error("invalid scope: {0}")]
    InvalidScope(#[from] ScopeError),

    /// The session was built without a required collaborator
    #[error("session is missing the {0} collaborator")]
    MissingCollaborator(&'static str),
}

/// Classification of a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Network failure, timeout or server error; retrying may succeed
    Transient,
    /// The pipeline does not exist in this scope
    NotFound,
    /// The stored version moved since the document was fetched
    Conflict,
    /// The service refused the request for any other reason
    Rejected,
}

/// A remote failure as recorded on the session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classifies a client error
    pub fn from_client_error(err: &ClientError) -> Self {
        let kind = if err.is_not_found() {
            FetchErrorKind::NotFound
        } else if err.is_conflict() {
            FetchErrorKind::Conflict
        } else if err.is_transient() {
            FetchErrorKind::Transient
        } else {
            FetchErrorKind::Rejected
        };
        Self::new(kind, err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FetchErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == FetchErrorKind::Conflict
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
