//! Extraction: runtime datastore to source tree.
//!
//! Extraction is an import path. It reads every pack the host system lists,
//! and for the requested packs writes one sanitized, link-by-name,
//! deterministically ordered JSON file per document.
//!
//! Phases:
//!
//! 1. Read every pack and populate the link index (barrier).
//! 2. Per pack, in parallel: sanitize, rewrite links to names, sort
//!    embedded items, and check slug uniqueness.
//! 3. Per container pack, in parallel: deflate embedded items against the
//!    item packs prepared in phase 2.
//! 4. Replace each requested pack directory and write its files.
//!
//! Nothing is written unless every pack gets through phase 3.

use std::collections::HashMap;
use std::sync::Arc;

use grimoire_content::{Document, ItemSorter, PackType, SanitizeOptions, Sanitizer, slug_mismatch, to_source_string};
use grimoire_core::{Diagnostics, Error, PipelineConfig, Result};
use grimoire_links::{Direction, LinkIndex, LinkIndexBuilder, LinkResolver};
use serde_json::Value;

use crate::cache::{CanonicalCache, PreparedItems};
use crate::datastore::{Datastore, DatastorePack};
use crate::deflate::Deflater;
use crate::source::{PackDir, write_pack};
use crate::stats::{ExtractStats, PackStats};
use crate::tasks::run_blocking;

/// Which packs to write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PackSelection {
    /// Every pack in the manifest.
    #[default]
    All,
    /// One pack, by name.
    Named(String),
}

impl PackSelection {
    /// Parse the CLI form: `all` or a pack name.
    pub fn parse(value: &str) -> Self {
        if value == "all" {
            Self::All
        } else {
            Self::Named(value.to_string())
        }
    }

    fn includes(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(selected) => selected == name,
        }
    }
}

/// Extraction settings.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Packs to write.
    pub selection: PackSelection,
    /// Sort embedded items (on by default).
    pub presort: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            selection: PackSelection::All,
            presort: true,
        }
    }
}

/// A pack after phase 2.
struct PreparedPack {
    name: String,
    pack_type: PackType,
    write: bool,
    documents: Vec<Document>,
}

/// Extracts packs from a host datastore into the source tree.
#[derive(Debug)]
pub struct Extractor {
    config: Arc<PipelineConfig>,
    diagnostics: Arc<Diagnostics>,
    options: ExtractOptions,
}

impl Extractor {
    /// Create an extractor.
    pub fn new(config: PipelineConfig, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            config: Arc::new(config),
            diagnostics,
            options: ExtractOptions::default(),
        }
    }

    /// Use `options`.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the extraction.
    pub async fn run(&self, datastore: &Datastore) -> Result<ExtractStats> {
        let listed = datastore.packs();
        if listed.is_empty() {
            return Err(Error::config("the datastore manifest lists no packs"));
        }
        if let PackSelection::Named(name) = &self.options.selection {
            if datastore.pack(name).is_none() {
                return Err(Error::config(format!("pack \"{name}\" is not listed in the manifest")));
            }
        }

        // Phase 1: read everything, then freeze the index
        let raw_packs = self.read_packs(listed).await?;
        let mut builder = LinkIndexBuilder::new();
        for (pack, documents) in &raw_packs {
            builder.declare_pack(&pack.name);
            for document in documents {
                builder
                    .register_document(&pack.name, document)
                    .map_err(|e| e.in_document(&pack.name, &document.name))?;
            }
        }
        let index = Arc::new(builder.finish());

        // Phase 2: prepare requested packs and every item pack
        let prepared = self.prepare_packs(raw_packs, &index).await?;

        // Phase 3: deflate embedded items against the prepared item packs
        let mut canonical = PreparedItems::new();
        for pack in prepared.iter().filter(|p| p.pack_type == PackType::Item) {
            for document in &pack.documents {
                canonical.insert(&pack.name, &document.slug(), document.to_value());
            }
        }
        let cache = Arc::new(CanonicalCache::new(canonical));
        let rendered = self.render_packs(prepared, cache).await?;

        // Phase 4: write
        let mut stats = ExtractStats {
            source_root: self.config.source_root.clone(),
            ..Default::default()
        };
        for (pack, files, pack_stats) in rendered {
            write_pack(&pack, &files)?;
            log::info!("extracted {} documents into {}", pack_stats.documents, pack.path.display());
            stats.packs.push(pack_stats);
        }
        stats.warnings = self.diagnostics.count();
        Ok(stats)
    }

    async fn read_packs(&self, listed: &[DatastorePack]) -> Result<Vec<(DatastorePack, Vec<Document>)>> {
        let jobs: Vec<_> = listed
            .iter()
            .cloned()
            .map(|pack| {
                move || -> Result<(DatastorePack, Vec<Document>)> {
                    let documents = pack
                        .read()?
                        .into_iter()
                        .map(|value| parse_raw(value, &pack))
                        .collect::<Result<Vec<_>>>()?;
                    log::debug!("read {} documents from {}", documents.len(), pack.name);
                    Ok((pack, documents))
                }
            })
            .collect();
        run_blocking(jobs).await
    }

    async fn prepare_packs(
        &self,
        raw_packs: Vec<(DatastorePack, Vec<Document>)>,
        index: &Arc<LinkIndex>,
    ) -> Result<Vec<PreparedPack>> {
        let jobs: Vec<_> = raw_packs
            .into_iter()
            .filter_map(|(pack, documents)| {
                let write = self.options.selection.includes(&pack.name);
                if !write && pack.pack_type != PackType::Item {
                    return None;
                }
                let config = Arc::clone(&self.config);
                let diagnostics = Arc::clone(&self.diagnostics);
                let index = Arc::clone(index);
                let presort = self.options.presort;
                Some(move || -> Result<PreparedPack> {
                    let documents =
                        prepare_pack(&pack, documents, &config, &diagnostics, &index, presort && write)?;
                    Ok(PreparedPack {
                        name: pack.name,
                        pack_type: pack.pack_type,
                        write,
                        documents,
                    })
                })
            })
            .collect();
        run_blocking(jobs).await
    }

    async fn render_packs(
        &self,
        prepared: Vec<PreparedPack>,
        cache: Arc<CanonicalCache>,
    ) -> Result<Vec<(PackDir, Vec<(String, String)>, PackStats)>> {
        let jobs: Vec<_> = prepared
            .into_iter()
            .filter(|pack| pack.write)
            .map(|pack| {
                let config = Arc::clone(&self.config);
                let cache = Arc::clone(&cache);
                move || render_pack(pack, &config, &cache)
            })
            .collect();
        run_blocking(jobs).await
    }
}

fn parse_raw(value: Value, pack: &DatastorePack) -> Result<Document> {
    let label = value
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| value.get("_id").and_then(Value::as_str))
        .unwrap_or("<unnamed>")
        .to_string();
    Document::from_value(value, pack.pack_type).map_err(|e| e.in_document(&pack.name, &label))
}

fn prepare_pack(
    pack: &DatastorePack,
    documents: Vec<Document>,
    config: &PipelineConfig,
    diagnostics: &Diagnostics,
    index: &LinkIndex,
    presort: bool,
) -> Result<Vec<Document>> {
    let sanitizer = Sanitizer::new(config.system_id.as_str());
    let resolver = LinkResolver::new(index, &config.system_id);
    let sorter = ItemSorter::new(diagnostics);

    let mut slugs: HashMap<String, String> = HashMap::new();
    let mut prepared = Vec::with_capacity(documents.len());
    for document in documents {
        let mut document = sanitizer.sanitize(&document, SanitizeOptions::default());
        resolver.resolve_document(&mut document, &pack.name, Direction::ToNames)?;
        if presort {
            sorter.sort_document(&mut document);
        }

        if let Some(other) = slugs.insert(document.slug(), document.name.clone()) {
            return Err(Error::integrity(format!(
                "\"{other}\" and \"{}\" both map to file {} in pack \"{}\"",
                document.name,
                document.filename(),
                pack.name
            )));
        }
        if let Some(expected) = slug_mismatch(&document) {
            diagnostics.warn(format!(
                "\"{}\" in pack \"{}\" has system.slug \"{}\" but its name slugifies to \"{expected}\"",
                document.name,
                pack.name,
                document.slug_field().unwrap_or_default()
            ));
        }
        prepared.push(document);
    }
    Ok(prepared)
}

fn render_pack(
    pack: PreparedPack,
    config: &PipelineConfig,
    cache: &CanonicalCache,
) -> Result<(PackDir, Vec<(String, String)>, PackStats)> {
    let sanitizer = Sanitizer::new(config.system_id.as_str());
    let deflater = Deflater::new(&config.system_id, &sanitizer, cache);
    let mut stats = PackStats {
        name: pack.name.clone(),
        ..Default::default()
    };

    let mut files = Vec::with_capacity(pack.documents.len());
    for document in &pack.documents {
        let mut value = document.to_value();
        if let Some(Value::Array(items)) = value.get_mut("items") {
            for (slot, item) in items.iter_mut().zip(&document.items) {
                if let Some(record) = deflater
                    .deflate(item)
                    .map_err(|e| e.in_document(&pack.name, &document.name))?
                {
                    *slot = record.to_value()?;
                    stats.deflated += 1;
                }
            }
        }
        stats.documents += 1;
        stats.embedded_items += document.items.len();
        files.push((document.filename(), to_source_string(value)?));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let dir = PackDir::new(&config.source_root, &pack.name, pack.pack_type);
    Ok((dir, files, stats))
}
