//! Compilation: source tree to compiled packs.
//!
//! Phases:
//!
//! 1. Per pack, in parallel: read source files, inflate deflated embedded
//!    items, parse, and check ids and file names.
//! 2. Populate the link index from every pack (barrier).
//! 3. Per pack, in parallel: validate, rewrite links to ids, and render
//!    one compact line per document.
//! 4. Write every compiled pack.
//!
//! Any error stops the run before phase 4, so a failed build leaves the
//! previous output untouched.

use std::collections::HashMap;
use std::sync::Arc;

use grimoire_content::{Document, Sanitizer, to_compact_line};
use grimoire_core::{Diagnostics, Error, PipelineConfig, Result};
use grimoire_links::{Direction, LinkIndex, LinkIndexBuilder, LinkResolver, RedirectTable};
use serde_json::{Value, json};

use crate::cache::{CanonicalCache, SourceTreeLoader};
use crate::deflate::Deflater;
use crate::source::{PackDir, discover_packs, read_pack, write_compiled};
use crate::stats::{BuildStats, PackStats};
use crate::tasks::run_blocking;
use crate::validate::Validator;

/// A pack after phase 1.
struct LoadedPack {
    dir: PackDir,
    documents: Vec<Document>,
    inflated: usize,
}

/// Compiles the source tree into runtime packs.
#[derive(Debug)]
pub struct Compiler {
    config: Arc<PipelineConfig>,
    diagnostics: Arc<Diagnostics>,
}

impl Compiler {
    /// Create a compiler.
    pub fn new(config: PipelineConfig, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            config: Arc::new(config),
            diagnostics,
        }
    }

    /// Run the build.
    pub async fn run(&self) -> Result<BuildStats> {
        let packs = discover_packs(&self.config.source_root)?;
        if packs.is_empty() {
            return Err(Error::config(format!(
                "no pack directories found under {}",
                self.config.source_root.display()
            )));
        }
        log::info!("compiling {} packs from {}", packs.len(), self.config.source_root.display());

        // Phase 1
        let cache = Arc::new(CanonicalCache::new(SourceTreeLoader::new(&self.config.source_root)));
        let loaded = self.load_packs(packs, cache).await?;

        // Phase 2
        let mut builder = LinkIndexBuilder::new();
        for pack in &loaded {
            builder.declare_pack(&pack.dir.name);
            for document in &pack.documents {
                builder
                    .register_document(&pack.dir.name, document)
                    .map_err(|e| e.in_document(&pack.dir.name, &document.name))?;
            }
        }
        let index = Arc::new(builder.finish());
        let redirects = Arc::new(RedirectTable::load(&self.config.redirects_path())?);
        if !redirects.is_empty() {
            log::debug!("loaded {} redirects", redirects.len());
        }

        // Phase 3
        let compiled = self.compile_packs(loaded, index, redirects).await?;

        // Phase 4
        let mut stats = BuildStats {
            output_root: self.config.output_root.clone(),
            ..Default::default()
        };
        for (lines, pack_stats) in compiled {
            let path = write_compiled(&self.config.output_root, &pack_stats.name, &lines)?;
            log::info!("compiled {} documents into {}", pack_stats.documents, path.display());
            stats.packs.push(pack_stats);
        }
        stats.warnings = self.diagnostics.count();
        Ok(stats)
    }

    async fn load_packs(&self, packs: Vec<PackDir>, cache: Arc<CanonicalCache>) -> Result<Vec<LoadedPack>> {
        let jobs: Vec<_> = packs
            .into_iter()
            .map(|dir| {
                let config = Arc::clone(&self.config);
                let cache = Arc::clone(&cache);
                move || load_pack(dir, &config, &cache)
            })
            .collect();
        run_blocking(jobs).await
    }

    async fn compile_packs(
        &self,
        loaded: Vec<LoadedPack>,
        index: Arc<LinkIndex>,
        redirects: Arc<RedirectTable>,
    ) -> Result<Vec<(Vec<String>, PackStats)>> {
        let jobs: Vec<_> = loaded
            .into_iter()
            .map(|pack| {
                let config = Arc::clone(&self.config);
                let diagnostics = Arc::clone(&self.diagnostics);
                let index = Arc::clone(&index);
                let redirects = Arc::clone(&redirects);
                move || compile_pack(pack, &config, &diagnostics, &index, &redirects)
            })
            .collect();
        run_blocking(jobs).await
    }
}

fn load_pack(dir: PackDir, config: &PipelineConfig, cache: &CanonicalCache) -> Result<LoadedPack> {
    let sanitizer = Sanitizer::new(config.system_id.as_str());
    let deflater = Deflater::new(&config.system_id, &sanitizer, cache);

    let mut documents = Vec::new();
    let mut ids: HashMap<String, String> = HashMap::new();
    let mut inflated = 0;
    for mut file in read_pack(&dir)? {
        inflated += deflater.inflate_container(&mut file.value, &dir.name)?;
        let document = Document::from_value(file.value, dir.pack_type)
            .map_err(|e| e.in_document(&dir.name, &file.filename))?;

        if let Some(other) = ids.insert(document.id.to_string(), document.name.clone()) {
            return Err(Error::integrity(format!(
                "\"{other}\" and \"{}\" share id {} in pack \"{}\"",
                document.name, document.id, dir.name
            )));
        }
        if file.filename != document.filename() {
            return Err(Error::integrity(format!(
                "{} should be named {}",
                file.path.display(),
                document.filename()
            ))
            .in_document(&dir.name, &document.name));
        }
        documents.push(document);
    }
    log::debug!("loaded {} documents from {}", documents.len(), dir.path.display());
    Ok(LoadedPack {
        dir,
        documents,
        inflated,
    })
}

fn compile_pack(
    pack: LoadedPack,
    config: &PipelineConfig,
    diagnostics: &Diagnostics,
    index: &LinkIndex,
    redirects: &RedirectTable,
) -> Result<(Vec<String>, PackStats)> {
    let validator = Validator::new(config, diagnostics);
    let resolver = LinkResolver::new(index, &config.system_id).with_redirects(redirects);
    let name = pack.dir.name;

    let mut stats = PackStats {
        name: name.clone(),
        inflated: pack.inflated,
        ..Default::default()
    };
    let mut lines = Vec::with_capacity(pack.documents.len());
    for mut document in pack.documents {
        validator.validate_document(&name, pack.dir.pack_type, &document)?;
        resolver.resolve_document(&mut document, &name, Direction::ToIds)?;

        stats.documents += 1;
        stats.embedded_items += document.items.len();
        let mut value = document.to_value();
        if let Value::Object(map) = &mut value {
            map.insert("ownership".into(), json!({ "default": 0 }));
        }
        lines.push(to_compact_line(value)?);
    }
    Ok((lines, stats))
}
