//! Shared fixtures for the pack pipeline integration tests.
//!
//! [`Workspace`] lays out a throwaway project: a host datastore to extract
//! from, a source tree to compile, and the configuration pointing at both.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grimoire_content::{PackType, to_source_string};
use grimoire_core::{Diagnostics, PipelineConfig, slugify};
use grimoire_packs::{Compiler, Datastore, ExtractOptions, ExtractStats, Extractor, PackDir};
use serde_json::{Value, json};
use tempfile::TempDir;

/// A temporary project directory.
pub struct Workspace {
    /// Keeps the directory alive for the test.
    pub dir: TempDir,
    /// Configuration rooted in `dir`.
    pub config: PipelineConfig,
}

impl Workspace {
    /// An empty project with default settings.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            source_root: PathBuf::from("packs"),
            output_root: PathBuf::from("dist"),
            ..Default::default()
        }
        .rooted_at(dir.path());
        fs::create_dir_all(&config.source_root).unwrap();
        Self { dir, config }
    }

    /// Write a source document under its slug.
    pub fn write_source(&self, pack: &str, pack_type: PackType, document: Value) {
        let name = document["name"].as_str().unwrap().to_string();
        self.write_source_file(pack, pack_type, &format!("{}.json", slugify(&name)), document);
    }

    /// Write a source document under an explicit file name.
    pub fn write_source_file(&self, pack: &str, pack_type: PackType, filename: &str, document: Value) {
        let dir = PackDir::new(&self.config.source_root, pack, pack_type);
        fs::create_dir_all(&dir.path).unwrap();
        fs::write(dir.path.join(filename), to_source_string(document).unwrap()).unwrap();
    }

    /// Write the redirect table.
    pub fn write_redirects(&self, table: Value) {
        fs::write(self.config.redirects_path(), table.to_string()).unwrap();
    }

    /// Read a source document back.
    pub fn source(&self, pack: &str, pack_type: PackType, slug: &str) -> Value {
        let path = PackDir::new(&self.config.source_root, pack, pack_type)
            .path
            .join(format!("{slug}.json"));
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    /// Whether the source tree holds a directory for `pack`.
    pub fn has_source_pack(&self, pack: &str, pack_type: PackType) -> bool {
        PackDir::new(&self.config.source_root, pack, pack_type).path.is_dir()
    }

    /// Raw text of a compiled pack.
    pub fn compiled_text(&self, pack: &str) -> String {
        fs::read_to_string(self.config.output_root.join(format!("{pack}.db"))).unwrap()
    }

    /// Parsed lines of a compiled pack.
    pub fn compiled(&self, pack: &str) -> Vec<Value> {
        self.compiled_text(pack)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// Write a host datastore holding `packs` (`(name, document type, records)`)
    /// and return its manifest path.
    pub fn write_datastore(&self, packs: &[(&str, &str, Vec<Value>)]) -> PathBuf {
        let root = self.dir.path().join("host/Data/systems/pf2e");
        fs::create_dir_all(root.join("packs")).unwrap();
        let mut listed = Vec::new();
        for (name, doc_type, records) in packs {
            let path = format!("packs/{name}.db");
            let lines: Vec<String> = records.iter().map(Value::to_string).collect();
            fs::write(root.join(&path), lines.join("\n")).unwrap();
            listed.push(json!({ "name": name, "type": doc_type, "path": path }));
        }
        let manifest = root.join("system.json");
        fs::write(&manifest, json!({ "id": "pf2e", "packs": listed }).to_string()).unwrap();
        manifest
    }

    /// A compiler over this project.
    pub fn compiler(&self) -> Compiler {
        Compiler::new(self.config.clone(), Arc::new(Diagnostics::silent()))
    }

    /// Extract from the datastore at `manifest`.
    pub async fn extract(&self, manifest: &Path, options: ExtractOptions) -> grimoire_core::Result<ExtractStats> {
        let datastore = Datastore::open(manifest)?;
        Extractor::new(self.config.clone(), Arc::new(Diagnostics::silent()))
            .with_options(options)
            .run(&datastore)
            .await
    }
}

// ============================================================================
// Runtime records
// ============================================================================

const FIREBALL_TEXT: &str = "<p>A roaring blast. See @UUID[Compendium.pf2e.spells.Item.heal000000000001]{Heal}.</p>";

/// Fireball as the host stores it.
pub fn fireball() -> Value {
    json!({
        "_id": "fireball00000001",
        "name": "Fireball",
        "type": "spell",
        "img": "systems/pf2e/icons/spells/fireball.webp",
        "sort": 0,
        "folder": null,
        "ownership": { "default": 0, "playerOne0000001": 3 },
        "_stats": { "createdTime": 1700000000000u64, "compendiumSource": null },
        "flags": { "babele": { "translated": true } },
        "system": {
            "level": { "value": "3" },
            "description": { "value": FIREBALL_TEXT, "gm": "" },
            "traits": { "value": ["fire", "evocation", "fire"], "rarity": "common" },
            "rules": []
        }
    })
}

/// Heal as the host stores it.
pub fn heal() -> Value {
    json!({
        "_id": "heal000000000001",
        "name": "Heal",
        "type": "spell",
        "img": "systems/pf2e/icons/spells/heal.webp",
        "system": {
            "level": { "value": 1 },
            "description": { "value": "<p>Positive energy.</p>" },
            "traits": { "value": ["healing"] }
        }
    })
}

/// Attack of Opportunity as the host stores it.
pub fn attack_of_opportunity() -> Value {
    json!({
        "_id": "attackOfOpportun",
        "name": "Attack of Opportunity",
        "type": "action",
        "img": "systems/pf2e/icons/actions/Reaction.webp",
        "system": {
            "description": { "value": "<p>Strike back.</p>" },
            "actionType": { "value": "reaction" },
            "actionCategory": { "value": "defensive" },
            "requirements": { "value": "" }
        }
    })
}

/// A goblin caster carrying copies of the library items above.
pub fn goblin_mage() -> Value {
    let mut cast_fireball = fireball();
    cast_fireball["_id"] = json!("castFireball0001");
    cast_fireball["sort"] = json!(300000);
    cast_fireball["system"]["location"] = json!({ "value": "arcaneEntry00001" });
    cast_fireball["_stats"] = json!({ "compendiumSource": "Compendium.pf2e.spells.Item.fireball00000001" });

    let mut aoo = attack_of_opportunity();
    aoo["_id"] = json!("aooGoblinMage001");
    aoo["system"]["description"]["value"] = json!("<p>Strike back, with a staff.</p>");
    aoo["flags"] = json!({ "core": { "sourceId": "Compendium.pf2e.actions.Item.attackOfOpportun" } });

    json!({
        "_id": "goblinMage000001",
        "name": "Goblin Mage",
        "type": "npc",
        "img": "systems/pf2e/icons/bestiary/goblin-mage.webp",
        "ownership": { "default": 2 },
        "system": {
            "traits": { "size": { "value": "sm" }, "value": ["goblin", "humanoid"] },
            "details": { "publicNotes": "<p>Fond of @UUID[Compendium.pf2e.spells.Item.fireball00000001]{fire}.</p>" }
        },
        "items": [
            aoo,
            cast_fireball,
            {
                "_id": "arcaneEntry00001",
                "name": "Arcane Prepared Spells",
                "type": "spellcastingEntry",
                "sort": 100000,
                "system": { "tradition": { "value": "arcane" } }
            }
        ]
    })
}

/// A datastore with two item packs and a bestiary.
pub fn library_datastore(workspace: &Workspace) -> PathBuf {
    workspace.write_datastore(&[
        ("spells", "Item", vec![fireball(), heal()]),
        ("actions", "Item", vec![attack_of_opportunity()]),
        ("bestiary", "Actor", vec![goblin_mage()]),
    ])
}
