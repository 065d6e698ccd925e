//! Compiling hand-written source trees.

use grimoire_content::PackType;
use serde_json::json;

use crate::common::Workspace;

fn spell(id: &str, name: &str, description: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "name": name,
        "type": "spell",
        "img": "systems/pf2e/icons/spells/generic.webp",
        "system": { "level": { "value": 1 }, "description": { "value": description } }
    })
}

#[tokio::test]
async fn test_compile_writes_one_line_per_document() {
    let ws = Workspace::new();
    ws.write_source("spells", PackType::Item, spell("heal000000000001", "Heal", "<p>Mend.</p>"));
    ws.write_source(
        "spells",
        PackType::Item,
        spell(
            "fireball00000001",
            "Fireball",
            "<p>Boom. See @UUID[Compendium.pf2e.spells.Item.Heal]{Heal} and @Compendium[pf2e.spells.Heal].</p>",
        ),
    );

    let stats = ws.compiler().run().await.unwrap();
    assert_eq!(stats.packs.len(), 1);
    assert_eq!(stats.total_documents(), 2);

    let lines = ws.compiled("spells");
    // ordered by source file name
    assert_eq!(lines[0]["name"], "Fireball");
    assert_eq!(lines[1]["name"], "Heal");
    assert_eq!(lines[0]["ownership"], json!({ "default": 0 }));
    let text = lines[0]["system"]["description"]["value"].as_str().unwrap();
    assert!(text.contains("@UUID[Compendium.pf2e.spells.Item.heal000000000001]{Heal}"));
    assert!(text.contains("@Compendium[pf2e.spells.heal000000000001]"));
}

#[tokio::test]
async fn test_compile_is_byte_identical_when_rerun() {
    let ws = Workspace::new();
    ws.write_source("spells", PackType::Item, spell("heal000000000001", "Heal", "<p>Mend.</p>"));
    ws.write_source(
        "spells",
        PackType::Item,
        spell("fireball00000001", "Fireball", "<p>See @UUID[Compendium.pf2e.spells.Item.Heal]{Heal}.</p>"),
    );

    ws.compiler().run().await.unwrap();
    let first = ws.compiled_text("spells");
    ws.compiler().run().await.unwrap();
    assert_eq!(ws.compiled_text("spells"), first);
}

#[tokio::test]
async fn test_duplicate_id_names_both_documents() {
    let ws = Workspace::new();
    ws.write_source("spells", PackType::Item, spell("fireball00000001", "Fireball", "<p>Boom.</p>"));
    ws.write_source("spells", PackType::Item, spell("fireball00000001", "Heal", "<p>Mend.</p>"));

    let err = ws.compiler().run().await.unwrap_err();
    assert_eq!(err.category(), "IntegrityError");
    let message = err.to_string();
    assert!(message.contains("Fireball"));
    assert!(message.contains("Heal"));
    assert!(!ws.config.output_root.exists());
}

#[tokio::test]
async fn test_unknown_link_target_is_broken_link() {
    let ws = Workspace::new();
    ws.write_source(
        "spells",
        PackType::Item,
        spell("fireball00000001", "Fireball", "<p>See @Compendium[pf2e.spells.Unknown Spell]{it}.</p>"),
    );

    let err = ws.compiler().run().await.unwrap_err();
    assert_eq!(err.category(), "BrokenLink");
    let message = err.to_string();
    assert!(message.contains("Fireball"));
    assert!(message.contains("spells"));
    assert!(message.contains("Unknown Spell"));
}

#[tokio::test]
async fn test_inline_image_fails_before_any_write() {
    let ws = Workspace::new();
    ws.write_source("actions", PackType::Item, json!({
        "_id": "strike0000000001",
        "name": "Strike",
        "type": "action",
        "system": {}
    }));
    let mut doc = spell("fireball00000001", "Fireball", "<p>Boom.</p>");
    doc["img"] = json!("data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==");
    ws.write_source("spells", PackType::Item, doc);

    let err = ws.compiler().run().await.unwrap_err();
    assert_eq!(err.category(), "PolicyError");
    assert!(err.to_string().contains("Fireball"));
    assert!(!ws.config.output_root.join("actions.db").exists());
    assert!(!ws.config.output_root.join("spells.db").exists());
}

#[tokio::test]
async fn test_misnamed_source_file_rejected() {
    let ws = Workspace::new();
    ws.write_source_file("spells", PackType::Item, "fire-ball.json", spell("fireball00000001", "Fireball", ""));

    let err = ws.compiler().run().await.unwrap_err();
    assert_eq!(err.category(), "IntegrityError");
    assert!(err.to_string().contains("fireball.json"));
}

#[tokio::test]
async fn test_empty_source_tree_is_an_error() {
    let ws = Workspace::new();
    assert_eq!(ws.compiler().run().await.unwrap_err().category(), "ConfigError");
}

#[tokio::test]
async fn test_redirects_apply_to_renamed_targets() {
    let ws = Workspace::new();
    ws.write_source("spells", PackType::Item, spell("fireball00000001", "Fireball", "<p>Boom.</p>"));
    ws.write_source(
        "spells",
        PackType::Item,
        spell("heal000000000001", "Heal", "<p>Unlike @UUID[Compendium.pf2e.spells.Item.Fire Ball]{fire}.</p>"),
    );
    ws.write_redirects(json!({ "spells.Fire Ball": "spells.Fireball" }));

    ws.compiler().run().await.unwrap();
    let heal = &ws.compiled("spells")[1];
    assert!(
        heal["system"]["description"]["value"]
            .as_str()
            .unwrap()
            .contains("Item.fireball00000001]{fire}")
    );
}

#[tokio::test]
async fn test_legacy_world_reference_is_policy_error() {
    let ws = Workspace::new();
    ws.write_source(
        "spells",
        PackType::Item,
        spell("fireball00000001", "Fireball", "<p>Cast by @Actor[goblinMage000001].</p>"),
    );
    let err = ws.compiler().run().await.unwrap_err();
    assert_eq!(err.category(), "PolicyError");
    assert!(err.to_string().contains("Fireball"));
}

#[tokio::test]
async fn test_actor_links_address_embedded_items() {
    let ws = Workspace::new();
    ws.write_source("bestiary", PackType::Actor, json!({
        "_id": "goblinMage000001",
        "name": "Goblin Mage",
        "type": "npc",
        "system": { "traits": { "size": { "value": "sm" } } },
        "items": [
            { "_id": "staffStrike00001", "name": "Staff", "type": "melee", "sort": 100000, "system": { "weaponType": { "value": "melee" } } }
        ]
    }));
    ws.write_source(
        "spells",
        PackType::Item,
        spell(
            "fireball00000001",
            "Fireball",
            "<p>Unlike @UUID[Compendium.pf2e.bestiary.Actor.Goblin Mage.Item.Staff]{a staff}.</p>",
        ),
    );

    ws.compiler().run().await.unwrap();
    let fireball = &ws.compiled("spells")[0];
    assert!(
        fireball["system"]["description"]["value"]
            .as_str()
            .unwrap()
            .contains("@UUID[Compendium.pf2e.bestiary.Actor.goblinMage000001.Item.staffStrike00001]{a staff}")
    );
}
