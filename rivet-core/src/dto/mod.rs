//! Data Transfer Objects for the authoring service
//!
//! This module contains DTOs exchanged between the session engine and the remote
//! authoring service. They wrap domain types with the metadata a single call returns.

pub mod pipeline;
pub mod reconcile;
pub mod template;
