//! The hierarchical section tree.
//!
//! This module handles:
//! - Arena-backed section storage with parent back-references
//! - Path normalization and idempotent ancestor creation
//! - Bare-key breadth search with direct-child-preference ambiguity handling
//! - Tree rendering for human display

pub mod display;
pub mod section;

pub use section::{ConfigTree, Resolved, SectionId};
