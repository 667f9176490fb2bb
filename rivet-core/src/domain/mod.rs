//! Core domain types
//!
//! This module contains the core domain structures used across Rivet crates.
//! These types represent the pipeline being authored and the scope it lives in,
//! and are shared between the session engine (for caching) and the client (for transport).

pub mod pipeline;
pub mod scope;
pub mod template;
