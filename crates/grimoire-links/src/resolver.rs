//! Link resolution in either direction.
//!
//! Compiled packs address link targets by id; source files address them by
//! name so they survive review and re-extraction. [`LinkResolver`] rewrites
//! every reference in a document's known link-bearing fields from one form
//! to the other, using a frozen [`LinkIndex`].
//!
//! Visited fields:
//!
//! - description and notes text (`system.description.*`, `system.details.*Notes`)
//! - journal `content` and `pages[].text.content`
//! - roll-table `description`, `results[].text`, and `results[]` document references
//! - rule elements: `GrantItem.uuid`, `ChoiceSet.choices[].value`, `Aura.effects[].uuid`
//! - `_stats.compendiumSource`
//!
//! The same fields of embedded items are visited too. References anywhere
//! else pass through untouched.

use std::fmt;

use grimoire_content::Document;
use grimoire_core::{Error, Result};
use serde_json::{Map, Value};

use crate::index::LinkIndex;
use crate::pattern::{COMPENDIUM_LINK, CompendiumRef, Target, UUID_LINK, find_legacy, is_world_reference, try_replace_all};
use crate::redirects::RedirectTable;

/// Link-bearing text fields, relative to the document root.
const TEXT_FIELDS: &[&[&str]] = &[
    &["system", "description", "value"],
    &["system", "description", "gm"],
    &["system", "details", "publicNotes"],
    &["system", "details", "privateNotes"],
    &["content"],
    &["description"],
];

/// Which form link targets are rewritten into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Ids become names (extraction).
    ToNames,
    /// Names become ids (compilation).
    ToIds,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToNames => f.write_str("id→name"),
            Direction::ToIds => f.write_str("name→id"),
        }
    }
}

/// Where a reference was found, for error messages.
#[derive(Clone, Copy)]
struct Origin<'s> {
    document: &'s str,
    pack: &'s str,
}

impl Origin<'_> {
    fn legacy(&self, token: &str) -> Error {
        Error::policy(format!(
            "legacy world reference \"{token}\" is not allowed; use a compendium link"
        ))
        .in_document(self.pack, self.document)
    }
}

/// Rewrites references using a frozen index.
#[derive(Debug)]
pub struct LinkResolver<'a> {
    index: &'a LinkIndex,
    system_id: &'a str,
    redirects: Option<&'a RedirectTable>,
}

impl<'a> LinkResolver<'a> {
    /// Create a resolver for links into `system_id` compendia.
    pub fn new(index: &'a LinkIndex, system_id: &'a str) -> Self {
        Self {
            index,
            system_id,
            redirects: None,
        }
    }

    /// Consult `redirects` when resolving names to ids.
    pub fn with_redirects(mut self, redirects: &'a RedirectTable) -> Self {
        self.redirects = Some(redirects);
        self
    }

    /// Rewrite every reference in `document`, which lives in `pack`.
    pub fn resolve_document(&self, document: &mut Document, pack: &str, direction: Direction) -> Result<()> {
        let name = document.name.clone();
        let origin = Origin {
            document: &name,
            pack,
        };
        self.resolve_fields(&mut document.fields, origin, direction)?;
        for item in &mut document.items {
            self.resolve_fields(&mut item.fields, origin, direction)?;
        }
        Ok(())
    }

    /// Rewrite the links in one piece of free text.
    pub fn resolve_text(&self, text: &str, document: &str, pack: &str, direction: Direction) -> Result<String> {
        self.rewrite_text(text, Origin { document, pack }, direction)
    }

    fn resolve_fields(&self, fields: &mut Map<String, Value>, origin: Origin<'_>, direction: Direction) -> Result<()> {
        for path in TEXT_FIELDS {
            if let Some(Value::String(text)) = path_mut(fields, path) {
                *text = self.rewrite_text(text, origin, direction)?;
            }
        }

        if let Some(Value::Array(pages)) = fields.get_mut("pages") {
            for page in pages.iter_mut().filter_map(Value::as_object_mut) {
                if let Some(Value::String(text)) = path_mut(page, &["text", "content"]) {
                    *text = self.rewrite_text(text, origin, direction)?;
                }
            }
        }

        if let Some(Value::Array(rules)) = path_mut(fields, &["system", "rules"]) {
            for rule in rules.iter_mut().filter_map(Value::as_object_mut) {
                self.resolve_rule(rule, origin, direction)?;
            }
        }

        if let Some(slot) = path_mut(fields, &["_stats", "compendiumSource"]) {
            self.resolve_reference_slot(slot, origin, direction)?;
        }

        if let Some(Value::Array(results)) = fields.get_mut("results") {
            for result in results.iter_mut().filter_map(Value::as_object_mut) {
                self.resolve_table_result(result, origin, direction)?;
            }
        }

        Ok(())
    }

    fn resolve_rule(&self, rule: &mut Map<String, Value>, origin: Origin<'_>, direction: Direction) -> Result<()> {
        let key = rule.get("key").and_then(Value::as_str).map(str::to_string);
        match key.as_deref() {
            Some("GrantItem") => {
                if let Some(slot) = rule.get_mut("uuid") {
                    self.resolve_reference_slot(slot, origin, direction)?;
                }
            }
            Some("ChoiceSet") => {
                if let Some(Value::Array(choices)) = rule.get_mut("choices") {
                    for choice in choices.iter_mut().filter_map(Value::as_object_mut) {
                        if let Some(slot) = choice.get_mut("value") {
                            self.resolve_reference_slot(slot, origin, direction)?;
                        }
                    }
                }
            }
            Some("Aura") => {
                if let Some(Value::Array(effects)) = rule.get_mut("effects") {
                    for effect in effects.iter_mut().filter_map(Value::as_object_mut) {
                        if let Some(slot) = effect.get_mut("uuid") {
                            self.resolve_reference_slot(slot, origin, direction)?;
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn resolve_table_result(
        &self,
        result: &mut Map<String, Value>,
        origin: Origin<'_>,
        direction: Direction,
    ) -> Result<()> {
        if let Some(Value::String(text)) = result.get_mut("text") {
            *text = self.rewrite_text(text, origin, direction)?;
        }

        let collection = result
            .get("documentCollection")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let Some(target) = result
            .get("documentId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
        else {
            return Ok(());
        };

        let Some((system, pack)) = collection.split_once('.') else {
            if collection.is_empty() {
                return Ok(());
            }
            return Err(origin.legacy(&format!("{collection}.{target}")));
        };
        if system != self.system_id {
            return Ok(());
        }

        let (new_pack, new_target) = self.resolve_target(pack, &target, false, origin, direction)?;
        result.insert("documentId".into(), Value::String(new_target));
        if new_pack != pack {
            result.insert(
                "documentCollection".into(),
                Value::String(format!("{system}.{new_pack}")),
            );
        }
        Ok(())
    }

    /// Rewrite a bare `Compendium.` reference held in a structured field.
    fn resolve_reference_slot(&self, slot: &mut Value, origin: Origin<'_>, direction: Direction) -> Result<()> {
        let Value::String(value) = slot else {
            return Ok(());
        };
        if is_world_reference(value) {
            return Err(origin.legacy(value));
        }
        let Some(mut reference) = CompendiumRef::parse(value) else {
            return Ok(());
        };
        if reference.system != self.system_id {
            return Ok(());
        }
        let (pack, target) = self.resolve_target(
            &reference.pack,
            &reference.target,
            reference.doc_type == "Actor",
            origin,
            direction,
        )?;
        reference.pack = pack;
        reference.target = target;
        *value = reference.render();
        Ok(())
    }

    fn rewrite_text(&self, text: &str, origin: Origin<'_>, direction: Direction) -> Result<String> {
        if let Some(legacy) = find_legacy(text) {
            return Err(origin.legacy(legacy));
        }

        let text = try_replace_all(&UUID_LINK, text, |caps| -> Result<String> {
            let (system, pack, doc_type, target) = (&caps[1], &caps[2], &caps[3], &caps[4]);
            if system != self.system_id {
                return Ok(caps[0].to_string());
            }
            let label = caps.get(5).map_or("", |m| m.as_str());
            let (pack, target) = self.resolve_target(pack, target, doc_type == "Actor", origin, direction)?;
            Ok(format!("@UUID[Compendium.{system}.{pack}.{doc_type}.{target}]{label}"))
        })?;

        try_replace_all(&COMPENDIUM_LINK, &text, |caps| -> Result<String> {
            let (system, pack, target) = (&caps[1], &caps[2], &caps[3]);
            if system != self.system_id {
                return Ok(caps[0].to_string());
            }
            let label = caps.get(4).map_or("", |m| m.as_str());
            let (pack, target) = self.resolve_target(pack, target, false, origin, direction)?;
            Ok(format!("@Compendium[{system}.{pack}.{target}]{label}"))
        })
    }

    /// Resolve one target token, returning the (possibly redirected) pack and the new token.
    fn resolve_target(
        &self,
        pack: &str,
        target: &str,
        addresses_items: bool,
        origin: Origin<'_>,
        direction: Direction,
    ) -> Result<(String, String)> {
        match direction {
            Direction::ToIds => self.target_to_ids(pack, target, addresses_items, origin),
            Direction::ToNames => self.target_to_names(pack, target, addresses_items, origin),
        }
    }

    fn target_to_ids(
        &self,
        pack: &str,
        target: &str,
        addresses_items: bool,
        origin: Origin<'_>,
    ) -> Result<(String, String)> {
        let (pack, target) = match self.redirects {
            Some(redirects) if self.index.name_of(pack, target).is_none() => {
                match redirects.apply(pack, target) {
                    Some((to_pack, to_target)) => {
                        log::debug!("redirecting {pack}.{target} to {to_pack}.{to_target}");
                        (to_pack, to_target)
                    }
                    None => (pack, target),
                }
            }
            _ => (pack, target),
        };

        let Target { document, embedded } = Target::split(target, addresses_items);
        let document_id = if self.index.name_of(pack, document).is_some() {
            document
        } else {
            self.index.resolve_to_id(pack, document, origin.document)?
        };
        let item_id = match embedded {
            None => None,
            Some(item) if self.index.embedded_name_of(pack, document_id, item).is_some() => Some(item),
            Some(item) => Some(
                self.index
                    .embedded_id_of(pack, document_id, item)
                    .ok_or_else(|| Error::broken_link(origin.document, pack, target))?,
            ),
        };
        Ok((pack.to_string(), Target::join(document_id, item_id)))
    }

    fn target_to_names(
        &self,
        pack: &str,
        target: &str,
        addresses_items: bool,
        origin: Origin<'_>,
    ) -> Result<(String, String)> {
        let Target { document, embedded } = Target::split(target, addresses_items);
        let (document_id, document_name) = if let Some(name) = self.index.name_of(pack, document) {
            (document, name)
        } else if let Some(id) = self.index.id_of(pack, document) {
            (id, document)
        } else {
            return Err(Error::broken_link(origin.document, pack, target));
        };
        let item_name = match embedded {
            None => None,
            Some(item) => {
                if let Some(name) = self.index.embedded_name_of(pack, document_id, item) {
                    Some(name)
                } else if self.index.embedded_id_of(pack, document_id, item).is_some() {
                    Some(item)
                } else {
                    return Err(Error::broken_link(origin.document, pack, target));
                }
            }
        };
        Ok((pack.to_string(), Target::join(document_name, item_name)))
    }
}

/// Walk `path` through nested objects.
fn path_mut<'v>(fields: &'v mut Map<String, Value>, path: &[&str]) -> Option<&'v mut Value> {
    let (first, rest) = path.split_first()?;
    let mut current = fields.get_mut(*first)?;
    for key in rest {
        current = current.as_object_mut()?.get_mut(*key)?;
    }
    Some(current)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::index::LinkIndexBuilder;
    use grimoire_content::PackType;
    use serde_json::json;

    fn index() -> LinkIndex {
        let mut builder = LinkIndexBuilder::new();
        builder.register("spells", "fireball00000001", "Fireball").unwrap();
        builder.register("spells", "forceBarrage0001", "Force Barrage").unwrap();
        builder.register("conditions", "frightened000001", "Frightened").unwrap();
        builder.register("effects", "auraOfFear000001", "Effect: Aura of Fear").unwrap();
        builder.register("bestiary", "goblinWarrior001", "Goblin Warrior").unwrap();
        builder
            .register_embedded("bestiary", "goblinWarrior001", "dogslicer0000001", "Dogslicer")
            .unwrap();
        builder.finish()
    }

    fn spell(description: &str) -> Document {
        Document::from_value(
            json!({
                "_id": "meteorSwarm00001",
                "name": "Meteor Swarm",
                "type": "spell",
                "system": { "description": { "value": description } }
            }),
            PackType::Item,
        )
        .unwrap()
    }

    fn description(doc: &Document) -> &str {
        doc.system_str(&["description", "value"]).unwrap()
    }

    #[test]
    fn test_names_to_ids_keeps_label() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut doc = spell("<p>Like @UUID[Compendium.pf2e.spells.Item.Fireball]{a big fireball} but bigger.</p>");
        resolver.resolve_document(&mut doc, "spells", Direction::ToIds).unwrap();
        assert_eq!(
            description(&doc),
            "<p>Like @UUID[Compendium.pf2e.spells.Item.fireball00000001]{a big fireball} but bigger.</p>"
        );
    }

    #[test]
    fn test_ids_to_names() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut doc = spell("@UUID[Compendium.pf2e.conditions.Item.frightened000001] and @Compendium[pf2e.spells.fireball00000001]{Fireball}");
        resolver.resolve_document(&mut doc, "spells", Direction::ToNames).unwrap();
        assert_eq!(
            description(&doc),
            "@UUID[Compendium.pf2e.conditions.Item.Frightened] and @Compendium[pf2e.spells.Fireball]{Fireball}"
        );
    }

    #[test]
    fn test_already_resolved_targets_kept() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut doc = spell("@UUID[Compendium.pf2e.spells.Item.fireball00000001]");
        resolver.resolve_document(&mut doc, "spells", Direction::ToIds).unwrap();
        assert_eq!(description(&doc), "@UUID[Compendium.pf2e.spells.Item.fireball00000001]");

        let mut doc = spell("@UUID[Compendium.pf2e.spells.Item.Fireball]");
        resolver.resolve_document(&mut doc, "spells", Direction::ToNames).unwrap();
        assert_eq!(description(&doc), "@UUID[Compendium.pf2e.spells.Item.Fireball]");
    }

    #[test]
    fn test_unknown_target_is_broken_link() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut doc = spell("@UUID[Compendium.pf2e.spells.Item.Wish]");
        let err = resolver.resolve_document(&mut doc, "spells", Direction::ToIds).unwrap_err();
        match err {
            Error::BrokenLink { source_doc, pack, token } => {
                assert_eq!(source_doc, "Meteor Swarm");
                assert_eq!(pack, "spells");
                assert_eq!(token, "Wish");
            }
            other => panic!("expected BrokenLink, got {other}"),
        }
    }

    #[test]
    fn test_legacy_reference_rejected_both_ways() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        for direction in [Direction::ToIds, Direction::ToNames] {
            let mut doc = spell("@Actor[abcdefghijklmnop]{Bob}");
            let err = resolver.resolve_document(&mut doc, "spells", direction).unwrap_err();
            assert_eq!(err.category(), "PolicyError");
            assert!(err.to_string().contains("Meteor Swarm"));
        }
    }

    #[test]
    fn test_foreign_system_untouched() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let text = "@UUID[Compendium.pf2e-animal-companions.companions.Actor.Wolf]{Wolf}";
        let mut doc = spell(text);
        resolver.resolve_document(&mut doc, "spells", Direction::ToIds).unwrap();
        assert_eq!(description(&doc), text);
    }

    #[test]
    fn test_redirects_applied_when_compiling() {
        let index = index();
        let redirects = RedirectTable::from_entries([("spells.Magic Missile", "spells.Force Barrage")]).unwrap();
        let resolver = LinkResolver::new(&index, "pf2e").with_redirects(&redirects);
        let mut doc = spell("@UUID[Compendium.pf2e.spells.Item.Magic Missile]");
        resolver.resolve_document(&mut doc, "spells", Direction::ToIds).unwrap();
        assert_eq!(description(&doc), "@UUID[Compendium.pf2e.spells.Item.forceBarrage0001]");
    }

    #[test]
    fn test_embedded_item_target() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut doc = spell("@UUID[Compendium.pf2e.bestiary.Actor.Goblin Warrior.Item.Dogslicer]");
        resolver.resolve_document(&mut doc, "spells", Direction::ToIds).unwrap();
        assert_eq!(
            description(&doc),
            "@UUID[Compendium.pf2e.bestiary.Actor.goblinWarrior001.Item.dogslicer0000001]"
        );
        resolver.resolve_document(&mut doc, "spells", Direction::ToNames).unwrap();
        assert_eq!(
            description(&doc),
            "@UUID[Compendium.pf2e.bestiary.Actor.Goblin Warrior.Item.Dogslicer]"
        );
    }

    #[test]
    fn test_rule_elements() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut doc = Document::from_value(
            json!({
                "_id": "frightfulPresenc",
                "name": "Frightful Presence",
                "type": "action",
                "system": {
                    "rules": [
                        { "key": "GrantItem", "uuid": "Compendium.pf2e.conditions.Item.Frightened" },
                        { "key": "ChoiceSet", "choices": [{ "value": "Compendium.pf2e.spells.Item.Fireball" }, { "value": "fire" }] },
                        { "key": "Aura", "effects": [{ "uuid": "Compendium.pf2e.effects.Item.Effect: Aura of Fear" }] },
                        { "key": "FlatModifier", "value": 2 }
                    ]
                }
            }),
            PackType::Item,
        )
        .unwrap();
        resolver.resolve_document(&mut doc, "actions", Direction::ToIds).unwrap();
        let rules = doc.get_path(&["system", "rules"]).unwrap();
        assert_eq!(rules[0]["uuid"], "Compendium.pf2e.conditions.Item.frightened000001");
        assert_eq!(rules[1]["choices"][0]["value"], "Compendium.pf2e.spells.Item.fireball00000001");
        assert_eq!(rules[1]["choices"][1]["value"], "fire");
        assert_eq!(rules[2]["effects"][0]["uuid"], "Compendium.pf2e.effects.Item.auraOfFear000001");
    }

    #[test]
    fn test_world_reference_in_rule_rejected() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut doc = Document::from_value(
            json!({
                "_id": "someFeat00000001",
                "name": "Some Feat",
                "type": "feat",
                "system": { "rules": [{ "key": "GrantItem", "uuid": "Item.abcdefghijklmnop" }] }
            }),
            PackType::Item,
        )
        .unwrap();
        let err = resolver.resolve_document(&mut doc, "feats", Direction::ToIds).unwrap_err();
        assert_eq!(err.category(), "PolicyError");
    }

    #[test]
    fn test_embedded_compendium_source() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut actor = Document::from_value(
            json!({
                "_id": "goblinMage000001",
                "name": "Goblin Mage",
                "type": "npc",
                "items": [{
                    "_id": "castFireball0001",
                    "name": "Fireball",
                    "type": "spell",
                    "_stats": { "compendiumSource": "Compendium.pf2e.spells.Item.fireball00000001" }
                }]
            }),
            PackType::Actor,
        )
        .unwrap();
        resolver.resolve_document(&mut actor, "bestiary", Direction::ToNames).unwrap();
        assert_eq!(
            actor.items[0].compendium_source(),
            Some("Compendium.pf2e.spells.Item.Fireball")
        );
    }

    #[test]
    fn test_roll_table_results() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut table = Document::from_value(
            json!({
                "_id": "randomSpells0001",
                "name": "Random Spells",
                "description": "Roll for @UUID[Compendium.pf2e.spells.Item.Fireball]",
                "results": [
                    { "type": "pack", "documentCollection": "pf2e.spells", "documentId": "Fireball", "text": "Fireball" },
                    { "type": "text", "documentCollection": "", "text": "Nothing" }
                ]
            }),
            PackType::RollTable,
        )
        .unwrap();
        resolver.resolve_document(&mut table, "tables", Direction::ToIds).unwrap();
        assert_eq!(table.fields["results"][0]["documentId"], "fireball00000001");
        assert_eq!(
            table.fields["description"],
            "Roll for @UUID[Compendium.pf2e.spells.Item.fireball00000001]"
        );
    }

    #[test]
    fn test_journal_pages() {
        let index = index();
        let resolver = LinkResolver::new(&index, "pf2e");
        let mut journal = Document::from_value(
            json!({
                "_id": "gmScreen00000001",
                "name": "GM Screen",
                "pages": [{ "name": "Conditions", "text": { "content": "@UUID[Compendium.pf2e.conditions.Item.Frightened]" } }]
            }),
            PackType::JournalEntry,
        )
        .unwrap();
        resolver.resolve_document(&mut journal, "journals", Direction::ToIds).unwrap();
        assert_eq!(
            journal.fields["pages"][0]["text"]["content"],
            "@UUID[Compendium.pf2e.conditions.Item.frightened000001]"
        );
    }
}
