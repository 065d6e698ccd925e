//! `grimoire extract`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use grimoire_core::{Diagnostics, Error, PipelineConfig, Result};
use grimoire_packs::{Datastore, ExtractOptions, ExtractStats, Extractor, HostConfig, PackSelection};

/// Arguments of one extract run.
#[derive(Debug)]
pub struct ExtractArgs {
    /// Pack name or `all`.
    pub pack: String,
    /// Host application config, if given.
    pub host_config: Option<PathBuf>,
    /// Keep stored item order.
    pub disable_presort: bool,
    /// Log non-fatal warnings.
    pub log_warnings: bool,
}

/// Find the host system manifest to read from.
pub fn manifest_path(config: &PipelineConfig, host_config: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = host_config {
        return Ok(HostConfig::load(path)?.manifest_path(&config.system_id));
    }
    config.datastore_manifest.clone().ok_or_else(|| {
        Error::config("no host config given and datastore_manifest is not set in the configuration")
    })
}

/// Extract the selected packs and print counts.
pub async fn cmd_extract(config: PipelineConfig, args: ExtractArgs) -> Result<ExtractStats> {
    let manifest = manifest_path(&config, args.host_config.as_deref())?;
    log::info!("reading datastore manifest {}", manifest.display());
    let datastore = Datastore::open(&manifest)?;

    let options = ExtractOptions {
        selection: PackSelection::parse(&args.pack),
        presort: !args.disable_presort,
    };
    let diagnostics = Arc::new(Diagnostics::new(args.log_warnings));
    let stats = Extractor::new(config, diagnostics)
        .with_options(options)
        .run(&datastore)
        .await?;

    for pack in &stats.packs {
        println!(
            "  {:<24} {:>6} documents  {:>6} embedded  {:>5} deflated",
            pack.name, pack.documents, pack.embedded_items, pack.deflated
        );
    }
    println!(
        "Extracted {} packs ({} documents) into {}",
        stats.packs.len(),
        stats.total_documents(),
        stats.source_root.display()
    );
    if stats.warnings > 0 {
        println!("{} warnings", stats.warnings);
    }
    Ok(stats)
}
