//! Run statistics.

use std::path::PathBuf;

use serde::Serialize;

/// Per-pack counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PackStats {
    /// Pack name.
    pub name: String,
    /// Top-level documents written.
    pub documents: usize,
    /// Embedded items across all documents.
    pub embedded_items: usize,
    /// Embedded items stored as canonical references (extraction).
    pub deflated: usize,
    /// Embedded items rebuilt from canonical references (compilation).
    pub inflated: usize,
}

/// Result of a compile run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BuildStats {
    /// Per-pack counts, ordered by pack name.
    pub packs: Vec<PackStats>,
    /// Non-fatal warnings emitted.
    pub warnings: usize,
    /// Directory the compiled packs were written to.
    pub output_root: PathBuf,
}

impl BuildStats {
    /// Documents across all packs.
    pub fn total_documents(&self) -> usize {
        self.packs.iter().map(|p| p.documents).sum()
    }

    /// Inflated embedded items across all packs.
    pub fn total_inflated(&self) -> usize {
        self.packs.iter().map(|p| p.inflated).sum()
    }
}

/// Result of an extract run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ExtractStats {
    /// Per-pack counts, ordered by pack name.
    pub packs: Vec<PackStats>,
    /// Non-fatal warnings emitted.
    pub warnings: usize,
    /// Source tree root the packs were written to.
    pub source_root: PathBuf,
}

impl ExtractStats {
    /// Documents across all packs.
    pub fn total_documents(&self) -> usize {
        self.packs.iter().map(|p| p.documents).sum()
    }

    /// Deflated embedded items across all packs.
    pub fn total_deflated(&self) -> usize {
        self.packs.iter().map(|p| p.deflated).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let stats = BuildStats {
            packs: vec![
                PackStats {
                    name: "spells".into(),
                    documents: 3,
                    ..Default::default()
                },
                PackStats {
                    name: "bestiary".into(),
                    documents: 2,
                    embedded_items: 9,
                    inflated: 4,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(stats.total_documents(), 5);
        assert_eq!(stats.total_inflated(), 4);
        assert_eq!(ExtractStats::default().total_deflated(), 0);
    }
}
