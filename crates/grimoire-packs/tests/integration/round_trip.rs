//! Extract followed by compile.

use std::fs;

use grimoire_content::PackType;
use grimoire_packs::ExtractOptions;
use serde_json::json;

use crate::common::{Workspace, library_datastore};

#[tokio::test]
async fn test_extract_then_compile_restores_links_and_items() {
    let ws = Workspace::new();
    let manifest = library_datastore(&ws);
    ws.extract(&manifest, ExtractOptions::default()).await.unwrap();

    let stats = ws.compiler().run().await.unwrap();
    let names: Vec<_> = stats.packs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["actions", "bestiary", "spells"]);
    assert_eq!(stats.total_inflated(), 2);

    let bestiary = ws.compiled("bestiary");
    assert_eq!(bestiary.len(), 1);
    let goblin = &bestiary[0];
    assert_eq!(goblin["ownership"], json!({ "default": 0 }));
    assert!(
        goblin["system"]["details"]["publicNotes"]
            .as_str()
            .unwrap()
            .contains("@UUID[Compendium.pf2e.spells.Item.fireball00000001]{fire}")
    );

    let items = goblin["items"].as_array().unwrap();
    let fireball = &items[1];
    assert_eq!(fireball["_id"], "castFireball0001");
    assert_eq!(fireball["name"], "Fireball");
    assert_eq!(fireball["sort"], 200000);
    assert_eq!(fireball["system"]["level"]["value"], 3);
    assert_eq!(fireball["system"]["location"], json!({ "value": "arcaneEntry00001" }));
    assert_eq!(
        fireball["_stats"]["compendiumSource"],
        "Compendium.pf2e.spells.Item.fireball00000001"
    );
    assert!(
        fireball["system"]["description"]["value"]
            .as_str()
            .unwrap()
            .contains("Item.heal000000000001]{Heal}")
    );

    let aoo = &items[2];
    assert_eq!(aoo["_id"], "aooGoblinMage001");
    assert_eq!(aoo["system"]["description"]["value"], "<p>Strike back, with a staff.</p>");
    assert_eq!(aoo["system"]["actionType"]["value"], "reaction");
    assert_eq!(
        aoo["_stats"]["compendiumSource"],
        "Compendium.pf2e.actions.Item.attackOfOpportun"
    );
}

#[tokio::test]
async fn test_reextracting_unchanged_data_is_stable() {
    let ws = Workspace::new();
    let manifest = library_datastore(&ws);
    let path = ws
        .config
        .source_root
        .join("bestiary.actors")
        .join("goblin-mage.json");

    ws.extract(&manifest, ExtractOptions::default()).await.unwrap();
    let first = fs::read_to_string(&path).unwrap();
    ws.extract(&manifest, ExtractOptions::default()).await.unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), first);
    assert!(ws.has_source_pack("actions", PackType::Item));
}
