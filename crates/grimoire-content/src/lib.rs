//! Document model and per-document transforms.
//!
//! Everything here operates on one document at a time and touches no
//! filesystem state. The orchestrators in `grimoire-packs` drive these
//! transforms across whole packs.
//!
//! # Modules
//!
//! - [`document`]: Pack types, document kinds, and the [`Document`] record
//! - [`json`]: Canonical key order and file rendering
//! - [`html`]: Description cleanup
//! - [`sanitize`]: Host-state removal, normalization, default elision
//! - [`sort`]: Embedded item ordering
//!
//! # Example
//!
//! ```rust
//! use grimoire_content::{Document, PackType, SanitizeOptions, Sanitizer};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "_id": "0123456789abcdef",
//!     "name": "Fireball",
//!     "type": "spell",
//!     "ownership": { "default": 0 },
//!     "system": { "description": { "value": "Boom.", "gm": "" } }
//! });
//! let doc = Sanitizer::new("pf2e")
//!     .sanitize_value(raw, PackType::Item, SanitizeOptions::default())
//!     .unwrap();
//! assert!(!doc.fields.contains_key("ownership"));
//! assert_eq!(doc.system_str(&["description", "value"]), Some("<p>Boom.</p>"));
//! ```

pub mod document;
pub mod html;
pub mod json;
pub mod sanitize;
pub mod sort;

// Re-export key types at crate root for convenience
pub use document::{Document, DocumentKind, PackType};
pub use html::{clean_description, has_inline_image};
pub use json::{canonicalize, fingerprint, to_compact_line, to_source_string};
pub use sanitize::{SanitizeOptions, Sanitizer, html_texts, slug_mismatch};
pub use sort::{ItemSorter, SORT_STEP};
