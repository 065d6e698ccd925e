//! Utility modules for path handling, slug computation, and config lookup.
//!
//! # Modules
//!
//! - [`ids`]: Slugs and document ids
//! - [`paths`]: Generic path utilities (tilde expansion, marker search)
//! - [`resolver`]: Config file resolution

pub mod ids;
pub mod paths;
pub mod resolver;
