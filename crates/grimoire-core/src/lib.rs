//! Grimoire Core: shared errors, configuration, and utilities.
//!
//! This crate provides the foundational types used across all Grimoire crates.
//! It has no internal Grimoire dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy and Result alias
//! - [`config`]: Pipeline configuration (TOML)
//! - [`diagnostics`]: Non-fatal warning sink
//! - [`util`]: Slug, id, path, and config-lookup utilities

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod util;

// Re-export key types at crate root for convenience
pub use config::PipelineConfig;
pub use diagnostics::Diagnostics;
pub use error::{Error, Result};

// Convenience re-exports from util
pub use util::ids::{DocumentId, looks_like_document_id, slugify};
