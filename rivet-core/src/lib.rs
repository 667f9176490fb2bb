//! Rivet Core
//!
//! Core types and abstractions for the Rivet pipeline studio.
//!
//! This crate contains:
//! - Domain types: the editable pipeline document, its scope and git association
//! - Identity: derivation of the cache key that addresses one editing session
//! - Compare: semantic equality between pipeline documents
//! - DTOs: Data transfer objects for talking to the authoring service

pub mod compare;
pub mod domain;
pub mod dto;
pub mod identity;
