//! # tidemark-core
//!
//! Core types, traits, and abstractions for tidemark bookmark search.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other tidemark crates depend on.

pub mod criteria;
pub mod defaults;
pub mod domain;
pub mod error;
pub mod logging;
pub mod models;
pub mod search;
pub mod traits;
pub mod vector;

// Re-export commonly used types at crate root
pub use criteria::{
    BrowseCriteria, CommonFilter, Criteria, DomainCriteria, TagCriteria, VectorCriteria,
    VectorThreshold,
};
pub use domain::{extract_domain, is_exact_domain};
pub use error::{Error, Result};
pub use models::*;
pub use search::*;
pub use traits::*;
pub use vector::{bookmark_distance, cosine_distance, distance_to_score};
