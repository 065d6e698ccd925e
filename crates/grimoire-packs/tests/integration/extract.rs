//! Extracting from a host datastore.

use grimoire_content::PackType;
use grimoire_packs::{ExtractOptions, PackSelection};
use serde_json::json;

use crate::common::{Workspace, fireball, heal, library_datastore};

#[tokio::test]
async fn test_extract_all_writes_sanitized_sources() {
    let ws = Workspace::new();
    let manifest = library_datastore(&ws);

    let stats = ws.extract(&manifest, ExtractOptions::default()).await.unwrap();
    assert_eq!(stats.packs.len(), 3);
    assert_eq!(stats.total_documents(), 4);

    let fireball = ws.source("spells", PackType::Item, "fireball");
    assert_eq!(fireball["_id"], "fireball00000001");
    assert_eq!(fireball["system"]["level"]["value"], 3);
    assert_eq!(fireball["system"]["traits"]["value"], json!(["evocation", "fire"]));
    for gone in ["ownership", "_stats", "sort", "folder", "flags"] {
        assert!(fireball.get(gone).is_none(), "{gone} should be pruned");
    }
    assert!(fireball["system"].get("rules").is_none());
    assert!(fireball["system"]["traits"].get("rarity").is_none());
    assert!(
        fireball["system"]["description"]["value"]
            .as_str()
            .unwrap()
            .contains("@UUID[Compendium.pf2e.spells.Item.Heal]{Heal}")
    );
}

#[tokio::test]
async fn test_extract_deflates_library_copies() {
    let ws = Workspace::new();
    let manifest = library_datastore(&ws);

    let stats = ws.extract(&manifest, ExtractOptions::default()).await.unwrap();
    assert_eq!(stats.total_deflated(), 2);

    let goblin = ws.source("bestiary", PackType::Actor, "goblin-mage");
    assert!(goblin.get("ownership").is_none());
    assert!(
        goblin["system"]["details"]["publicNotes"]
            .as_str()
            .unwrap()
            .contains("Item.Fireball]{fire}")
    );

    let items = goblin["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["name"], "Arcane Prepared Spells");
    assert_eq!(items[0]["sort"], 100000);

    // spell: reference plus location, no delta
    assert_eq!(
        items[1],
        json!({
            "_canonical": "spells.fireball",
            "location": { "value": "arcaneEntry00001" },
            "sort": 200000,
            "_id": "castFireball0001"
        })
    );

    // action: reference plus a description delta
    assert_eq!(items[2]["_canonical"], "actions.attack-of-opportunity");
    assert_eq!(items[2]["sort"], 300000);
    assert_eq!(
        items[2]["delta"],
        json!({ "system": { "description": { "value": "<p>Strike back, with a staff.</p>" } } })
    );
}

#[tokio::test]
async fn test_extract_one_pack_leaves_others_alone() {
    let ws = Workspace::new();
    let manifest = library_datastore(&ws);
    let options = ExtractOptions {
        selection: PackSelection::parse("bestiary"),
        ..Default::default()
    };

    let stats = ws.extract(&manifest, options).await.unwrap();
    assert_eq!(stats.packs.len(), 1);
    assert!(ws.has_source_pack("bestiary", PackType::Actor));
    assert!(!ws.has_source_pack("spells", PackType::Item));
    // item packs still serve as the canonical source
    assert_eq!(stats.total_deflated(), 2);
}

#[tokio::test]
async fn test_extract_without_presort_keeps_order() {
    let ws = Workspace::new();
    let manifest = library_datastore(&ws);
    let options = ExtractOptions {
        presort: false,
        ..Default::default()
    };

    ws.extract(&manifest, options).await.unwrap();
    let goblin = ws.source("bestiary", PackType::Actor, "goblin-mage");
    let items = goblin["items"].as_array().unwrap();
    assert_eq!(items[2]["name"], "Arcane Prepared Spells");
    assert_eq!(items[2]["sort"], 100000);
}

#[tokio::test]
async fn test_extract_replaces_stale_files() {
    let ws = Workspace::new();
    ws.write_source_file("spells", PackType::Item, "old-spell.json", heal());
    let manifest = library_datastore(&ws);

    ws.extract(&manifest, ExtractOptions::default()).await.unwrap();
    assert!(
        !ws.config
            .source_root
            .join("spells.items/old-spell.json")
            .exists()
    );
}

#[tokio::test]
async fn test_extract_unknown_pack_is_config_error() {
    let ws = Workspace::new();
    let manifest = library_datastore(&ws);
    let options = ExtractOptions {
        selection: PackSelection::parse("hazards"),
        ..Default::default()
    };
    assert_eq!(ws.extract(&manifest, options).await.unwrap_err().category(), "ConfigError");
}

#[tokio::test]
async fn test_extract_duplicate_slug_is_integrity_error() {
    let ws = Workspace::new();
    let mut twin = fireball();
    twin["_id"] = json!("fireball00000002");
    twin["name"] = json!("Fireball!");
    let manifest = ws.write_datastore(&[("spells", "Item", vec![fireball(), twin, heal()])]);

    let err = ws.extract(&manifest, ExtractOptions::default()).await.unwrap_err();
    assert_eq!(err.category(), "IntegrityError");
    assert!(err.to_string().contains("Fireball!"));
    assert!(!ws.has_source_pack("spells", PackType::Item));
}

#[tokio::test]
async fn test_extract_dangling_link_is_broken_link() {
    let ws = Workspace::new();
    let manifest = ws.write_datastore(&[("spells", "Item", vec![fireball()])]);

    let err = ws.extract(&manifest, ExtractOptions::default()).await.unwrap_err();
    assert_eq!(err.category(), "BrokenLink");
    assert!(err.to_string().contains("heal000000000001"));
}
