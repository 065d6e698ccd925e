//! Embedded item ordering.
//!
//! Statblocks read top to bottom, so the order of a creature's embedded
//! items matters. [`ItemSorter`] groups items into fixed type buckets, orders
//! each bucket with a type-specific rule, and assigns evenly spaced sort keys.
//! Sorting an already sorted list changes nothing.

use std::cmp::Ordering;
use std::sync::LazyLock;

use grimoire_core::Diagnostics;
use regex::Regex;

use crate::document::{Document, DocumentKind};

/// Distance between consecutive sort keys.
pub const SORT_STEP: i64 = 100_000;

/// Bucket order for embedded items.
const TYPE_PRIORITY: &[DocumentKind] = &[
    DocumentKind::SpellcastingEntry,
    DocumentKind::Spell,
    DocumentKind::Weapon,
    DocumentKind::Armor,
    DocumentKind::Shield,
    DocumentKind::Equipment,
    DocumentKind::Consumable,
    DocumentKind::Treasure,
    DocumentKind::Backpack,
    DocumentKind::Condition,
    DocumentKind::Effect,
    DocumentKind::Melee,
    DocumentKind::Action,
    DocumentKind::Lore,
];

/// Action categories, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum ActionCategory {
    Interaction,
    Defensive,
    Offensive,
    Other,
}

impl ActionCategory {
    fn of(item: &Document) -> Self {
        match item.action_category() {
            Some("interaction") => Self::Interaction,
            Some("defensive") => Self::Defensive,
            Some("offensive") => Self::Offensive,
            _ => Self::Other,
        }
    }
}

/// Named actions pinned to the start or end of their category.
struct PinRule {
    category: ActionCategory,
    top: Vec<Regex>,
    bottom: Vec<Regex>,
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(s).expect("action pin regex should compile"))
        .collect()
}

static PIN_RULES: LazyLock<Vec<PinRule>> = LazyLock::new(|| {
    vec![
        PinRule {
            category: ActionCategory::Interaction,
            top: patterns(&[
                "^Darkvision",
                "^Greater Darkvision",
                "^Low-Light Vision",
                "^Scent",
                "^Tremorsense",
                "^Wavesense",
                "^Lifesense",
                "^Thoughtsense",
                "^Echolocation",
            ]),
            bottom: patterns(&["^Telepathy"]),
        },
        PinRule {
            category: ActionCategory::Defensive,
            top: patterns(&["^All-Around Vision", "^Negative Healing", "^Void Healing"]),
            bottom: patterns(&["^Attack of Opportunity", "^Reactive Strike"]),
        },
        PinRule {
            category: ActionCategory::Offensive,
            top: patterns(&[
                "^Grab",
                "^Improved Grab",
                "^Knockdown",
                "^Improved Knockdown",
                "^Push",
                "^Improved Push",
            ]),
            bottom: Vec::new(),
        },
    ]
});

/// Where an action lands within its category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Pin {
    Top(usize),
    Unpinned,
    Bottom(usize),
}

impl Pin {
    fn of(category: ActionCategory, name: &str) -> Self {
        let Some(rule) = PIN_RULES.iter().find(|r| r.category == category) else {
            return Self::Unpinned;
        };
        if let Some(i) = rule.top.iter().position(|re| re.is_match(name)) {
            return Self::Top(i);
        }
        if let Some(i) = rule.bottom.iter().position(|re| re.is_match(name)) {
            return Self::Bottom(i);
        }
        Self::Unpinned
    }
}

/// Case-insensitive name order, ties broken by the raw name.
fn by_name(a: &Document, b: &Document) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

/// Higher levels first; items without a level after all leveled ones.
fn by_spell_level(a: &Document, b: &Document) -> Ordering {
    match (a.level(), b.level()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| by_name(a, b))
}

/// Weapon-type tag order; untagged items last. Stable within a tag.
fn by_weapon_type(a: &Document, b: &Document) -> Ordering {
    match (a.weapon_type(), b.weapon_type()) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn by_action(a: &Document, b: &Document) -> Ordering {
    let (cat_a, cat_b) = (ActionCategory::of(a), ActionCategory::of(b));
    cat_a
        .cmp(&cat_b)
        .then_with(|| Pin::of(cat_a, &a.name).cmp(&Pin::of(cat_b, &b.name)))
        .then_with(|| by_name(a, b))
}

/// Orders the embedded items of container documents.
#[derive(Debug)]
pub struct ItemSorter<'a> {
    diagnostics: &'a Diagnostics,
}

impl<'a> ItemSorter<'a> {
    /// Create a sorter reporting warnings to `diagnostics`.
    pub fn new(diagnostics: &'a Diagnostics) -> Self {
        Self { diagnostics }
    }

    /// Sort a container's embedded items in place. Non-containers are left alone.
    pub fn sort_document(&self, document: &mut Document) {
        if !document.kind.is_container() {
            return;
        }
        let items = std::mem::take(&mut document.items);
        log::trace!("sorting {} embedded items on \"{}\"", items.len(), document.name);
        document.items = self.sort_items(&document.name, items);
    }

    /// Order `items` belonging to `owner` and assign sort keys.
    pub fn sort_items(&self, owner: &str, items: Vec<Document>) -> Vec<Document> {
        let mut buckets: Vec<Vec<Document>> = TYPE_PRIORITY.iter().map(|_| Vec::new()).collect();
        let mut unhandled = Vec::new();

        for item in items {
            match TYPE_PRIORITY.iter().position(|kind| *kind == item.kind) {
                Some(i) => buckets[i].push(item),
                None => {
                    self.diagnostics.warn(format!(
                        "unhandled embedded item type \"{}\" for \"{}\" on \"{owner}\"; appending at end",
                        item.kind, item.name
                    ));
                    unhandled.push(item);
                }
            }
        }

        let mut ordered = Vec::new();
        for (kind, mut bucket) in TYPE_PRIORITY.iter().zip(buckets) {
            self.sort_bucket(*kind, owner, &mut bucket);
            ordered.extend(bucket);
        }
        ordered.extend(unhandled);

        for (i, item) in ordered.iter_mut().enumerate() {
            item.sort = Some((i as i64 + 1) * SORT_STEP);
        }
        ordered
    }

    fn sort_bucket(&self, kind: DocumentKind, owner: &str, bucket: &mut [Document]) {
        match kind {
            DocumentKind::SpellcastingEntry => {}
            DocumentKind::Spell => bucket.sort_by(by_spell_level),
            DocumentKind::Melee => {
                for item in bucket.iter().filter(|i| i.weapon_type().is_none()) {
                    self.diagnostics.warn(format!(
                        "melee item \"{}\" on \"{owner}\" has no weapon type",
                        item.name
                    ));
                }
                bucket.sort_by(by_weapon_type);
            }
            DocumentKind::Action => bucket.sort_by(by_action),
            _ => bucket.sort_by(by_name),
        }
    }
}
