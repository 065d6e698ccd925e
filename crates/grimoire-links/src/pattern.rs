//! Link token patterns.
//!
//! Two free-text forms are recognized:
//!
//! ```text
//! @UUID[Compendium.<system>.<pack>.<DocType>.<target>]{label}
//! @Compendium[<system>.<pack>.<target>]{label}
//! ```
//!
//! Structured fields hold the bare `Compendium.<system>.<pack>.<DocType>.<target>`
//! form. References that address a world document directly (`@Actor[..]`,
//! `@UUID[Item.<id>]` and friends) are legacy and rejected.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Document types a world reference may name.
const WORLD_TYPES: &str = "Actor|Item|JournalEntry|RollTable|Macro|Scene|Playlist|Cards";

pub(crate) static UUID_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@UUID\[Compendium\.([^.\]\s]+)\.([^.\]\s]+)\.([A-Za-z]+)\.([^\]]+)\](\{[^}]*\})?")
        .expect("UUID_LINK regex should compile")
});

pub(crate) static COMPENDIUM_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@Compendium\[([^.\]\s]+)\.([^.\]\s]+)\.([^\]]+)\](\{[^}]*\})?")
        .expect("COMPENDIUM_LINK regex should compile")
});

static LEGACY_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"@(?:{WORLD_TYPES})\[[^\]]*\]|@UUID\[(?:{WORLD_TYPES})\.[^\]]*\]"))
        .expect("LEGACY_LINK regex should compile")
});

static BARE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Compendium\.([^.\s]+)\.([^.\s]+)\.([A-Za-z]+)\.(.+)$").expect("BARE_REFERENCE regex should compile")
});

static BARE_WORLD_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:{WORLD_TYPES})\.[A-Za-z0-9]{{16}}")).expect("BARE_WORLD_REFERENCE regex should compile")
});

/// First legacy world reference in `text`, if any.
pub fn find_legacy(text: &str) -> Option<&str> {
    LEGACY_LINK.find(text).map(|m| m.as_str())
}

/// Whether a structured value is a direct world reference.
pub fn is_world_reference(value: &str) -> bool {
    BARE_WORLD_REFERENCE.is_match(value)
}

/// A parsed `Compendium.<system>.<pack>.<DocType>.<target>` reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompendiumRef {
    /// Game system namespace.
    pub system: String,
    /// Pack name.
    pub pack: String,
    /// Document type segment (`Item`, `Actor`, ...).
    pub doc_type: String,
    /// Target id or name; may address an embedded item.
    pub target: String,
}

impl CompendiumRef {
    /// Parse a bare reference.
    pub fn parse(value: &str) -> Option<Self> {
        BARE_REFERENCE.captures(value).map(|caps| Self {
            system: caps[1].to_string(),
            pack: caps[2].to_string(),
            doc_type: caps[3].to_string(),
            target: caps[4].to_string(),
        })
    }

    /// Render in bare form.
    pub fn render(&self) -> String {
        format!(
            "Compendium.{}.{}.{}.{}",
            self.system, self.pack, self.doc_type, self.target
        )
    }
}

/// A target split into its document part and optional embedded item part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target<'a> {
    /// Top-level document id or name.
    pub document: &'a str,
    /// Embedded item id or name (`<document>.Item.<item>`).
    pub embedded: Option<&'a str>,
}

impl<'a> Target<'a> {
    /// Split a target. Only actor references address embedded items.
    pub fn split(target: &'a str, addresses_items: bool) -> Self {
        if addresses_items {
            if let Some((document, item)) = target.split_once(".Item.") {
                return Self {
                    document,
                    embedded: Some(item),
                };
            }
        }
        Self {
            document: target,
            embedded: None,
        }
    }

    /// Join back into token form.
    pub fn join(document: &str, embedded: Option<&str>) -> String {
        match embedded {
            Some(item) => format!("{document}.Item.{item}"),
            None => document.to_string(),
        }
    }
}

/// `Regex::replace_all` with a fallible replacer; the first error wins.
pub(crate) fn try_replace_all<E>(
    regex: &Regex,
    text: &str,
    mut replace: impl FnMut(&Captures<'_>) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in regex.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replace(&caps)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}
