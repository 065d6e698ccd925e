//! HTML description cleanup.
//!
//! Descriptions are stored as HTML fragments. Text pasted in from other
//! sources brings along markup noise (Word classes, stray spans, non-breaking
//! spaces, inconsistent void tags). [`clean_description`] is a fixed sequence
//! of string rewrites that removes that noise. It does not parse HTML, and
//! running it on its own output changes nothing.
//!
//! # Example
//!
//! ```
//! use grimoire_content::html::clean_description;
//!
//! let cleaned = clean_description("You breathe fire.<br>\n\n<p>&nbsp;</p>");
//! assert_eq!(cleaned, "<p>You breathe fire.<br /></p>");
//! assert_eq!(clean_description(&cleaned), cleaned);
//! ```

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Block-level tags. Whitespace next to them carries no meaning.
const BLOCK_TAGS: &str =
    "p|div|h[1-6]|ul|ol|li|table|thead|tbody|tfoot|tr|td|th|hr|blockquote|section|aside|figure|header|footer";

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RUN regex should compile"));

static AROUND_BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\s*(</?(?:{BLOCK_TAGS})\b[^>]*>)\s*"))
        .expect("AROUND_BLOCK_TAG regex should compile")
});

static STARTS_WITH_BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^<(?:{BLOCK_TAGS})\b")).expect("STARTS_WITH_BLOCK_TAG regex should compile")
});

static EMPTY_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p>\s*</p>").expect("EMPTY_PARAGRAPH regex should compile"));

static VOID_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(br|hr)\s*/?>").expect("VOID_TAG regex should compile"));

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<img\b([^>]*?)\s*/?>").expect("IMG_TAG regex should compile"));

/// Attributes word processors and web scrapes leave behind.
static PASTE_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+(?:class="(?:Mso\w*|Body-Text\w*|Normal)"|id="ctl00_[^"]*"|lang="[^"]*"|dir="ltr"|data-(?:pm|mce)-[\w-]+="[^"]*")"#)
        .expect("PASTE_ATTRIBUTE regex should compile")
});

/// A span that has lost all its attributes wraps plain text for no reason.
static BARE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<span>([^<]*)</span>").expect("BARE_SPAN regex should compile"));

/// An image source holding encoded data instead of a path.
static INLINE_IMAGE_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*\bsrc\s*=\s*["']?\s*data:"#).expect("INLINE_IMAGE_SRC regex should compile")
});

/// Characters that survive copy-paste but render as nothing useful.
const INVISIBLE_CHARS: &[char] = &['\u{00ad}', '\u{200b}', '\u{feff}'];

/// Apply `regex` until it stops matching.
fn replace_to_fixpoint(regex: &Regex, text: String, replacement: &str) -> String {
    let mut current = text;
    loop {
        match regex.replace_all(&current, replacement) {
            Cow::Borrowed(_) => return current,
            Cow::Owned(next) => current = next,
        }
    }
}

/// Clean an HTML description fragment.
///
/// Steps, in order:
/// 1. Non-breaking spaces become plain spaces; invisible characters go.
/// 2. Paste artifacts are stripped: Word/scrape attributes, then spans
///    left with no attributes.
/// 3. Void tags are normalized to their self-closing form (`<br />`).
/// 4. Whitespace runs collapse to one space; whitespace around block
///    tags is removed.
/// 5. Empty paragraphs are removed.
/// 6. Text that does not open with a block tag is wrapped in `<p>`.
///
/// A removal in a late step can expose work for an earlier one (a span
/// that only wrapped an empty paragraph, say), so the steps repeat until
/// the text stops changing.
pub fn clean_description(html: &str) -> String {
    let mut current = clean_pass(html);
    for _ in 0..MAX_PASSES {
        let next = clean_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Upper bound on repeated passes; real descriptions settle in two.
const MAX_PASSES: usize = 8;

fn clean_pass(html: &str) -> String {
    let text: String = html
        .replace("&nbsp;", " ")
        .replace('\u{00a0}', " ")
        .chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect();

    let text = replace_to_fixpoint(&PASTE_ATTRIBUTE, text, "");
    let text = replace_to_fixpoint(&BARE_SPAN, text, "$1");

    let text = VOID_TAG.replace_all(&text, "<$1 />").into_owned();
    let text = IMG_TAG.replace_all(&text, "<img$1 />").into_owned();

    let text = WHITESPACE_RUN.replace_all(&text, " ").into_owned();
    let text = AROUND_BLOCK_TAG.replace_all(&text, "$1").into_owned();

    let text = replace_to_fixpoint(&EMPTY_PARAGRAPH, text, "");
    let text = text.trim();

    if text.is_empty() || STARTS_WITH_BLOCK_TAG.is_match(text) {
        text.to_string()
    } else {
        format!("<p>{text}</p>")
    }
}

/// Whether `html` embeds an image as inline data.
pub fn has_inline_image(html: &str) -> bool {
    INLINE_IMAGE_SRC.is_match(html)
}
