//! Grimoire Packs: extraction and compilation orchestrators.
//!
//! This crate wires the content and link crates into the two pipeline
//! directions:
//!
//! - [`Extractor`]: host runtime datastore → reviewable source tree
//! - [`Compiler`]: source tree → compiled runtime packs
//!
//! Both run per-pack work in parallel on the blocking pool and write
//! nothing until every pack has succeeded.
//!
//! # Modules
//!
//! - [`source`]: Source tree layout and compiled pack files
//! - [`datastore`]: Host manifest and append-log reader
//! - [`cache`]: Canonical item lookup
//! - [`deflate`]: Embedded item deflation and inflation
//! - [`validate`]: Compile-time checks
//! - [`extractor`] / [`compiler`]: The orchestrators
//! - [`stats`]: Run statistics

pub mod cache;
pub mod compiler;
pub mod datastore;
pub mod deflate;
pub mod extractor;
pub mod source;
pub mod stats;
pub mod tasks;
pub mod validate;

pub use cache::{CanonicalCache, CanonicalLoader, PreparedItems, SourceTreeLoader};
pub use compiler::Compiler;
pub use datastore::{Datastore, DatastorePack, HostConfig};
pub use deflate::{DeflatedItem, Deflater, Exemption};
pub use extractor::{ExtractOptions, Extractor, PackSelection};
pub use source::{PackDir, discover_packs};
pub use stats::{BuildStats, ExtractStats, PackStats};
pub use validate::Validator;
