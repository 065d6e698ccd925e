//! `grimoire build`.

use std::sync::Arc;

use grimoire_core::{Diagnostics, PipelineConfig, Result};
use grimoire_packs::{BuildStats, Compiler};

/// Compile every pack under the source root and print counts.
pub async fn cmd_build(config: PipelineConfig) -> Result<BuildStats> {
    let diagnostics = Arc::new(Diagnostics::default());
    let stats = Compiler::new(config, diagnostics).run().await?;

    for pack in &stats.packs {
        println!(
            "  {:<24} {:>6} documents  {:>6} embedded  {:>5} inflated",
            pack.name, pack.documents, pack.embedded_items, pack.inflated
        );
    }
    println!(
        "Compiled {} packs ({} documents) into {}",
        stats.packs.len(),
        stats.total_documents(),
        stats.output_root.display()
    );
    if stats.warnings > 0 {
        println!("{} warnings", stats.warnings);
    }
    Ok(stats)
}
