//! Cross-document links for Grimoire.
//!
//! Links between documents are stored by name in source files and by id in
//! compiled packs. This crate owns the lookups and the rewriting between the
//! two forms.
//!
//! # Modules
//!
//! - [`index`]: Two-phase name/id index over every pack in a run
//! - [`pattern`]: Link token syntax
//! - [`resolver`]: Rewriting references in either direction
//! - [`redirects`]: Renamed/moved target table for compilation
//!
//! # Example
//!
//! ```rust
//! use grimoire_links::{Direction, LinkIndexBuilder, LinkResolver};
//!
//! let mut builder = LinkIndexBuilder::new();
//! builder.register("spells", "fireball00000001", "Fireball").unwrap();
//! let index = builder.finish();
//!
//! let resolver = LinkResolver::new(&index, "pf2e");
//! let text = resolver
//!     .resolve_text("@UUID[Compendium.pf2e.spells.Item.Fireball]{Boom}", "Doc", "spells", Direction::ToIds)
//!     .unwrap();
//! assert_eq!(text, "@UUID[Compendium.pf2e.spells.Item.fireball00000001]{Boom}");
//! ```

pub mod index;
pub mod pattern;
pub mod redirects;
pub mod resolver;

pub use index::{LinkIndex, LinkIndexBuilder};
pub use pattern::CompendiumRef;
pub use redirects::RedirectTable;
pub use resolver::{Direction, LinkResolver};
