use std::sync::LazyLock;

use regex::Regex;

use crate::ItemId;

static ITEM_ID_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d+)\.md$").expect("ITEM_ID_SUFFIX: hardcoded regex is valid"));

/// Deterministic artifact filename: `{type}-{slug}-{id}.md`.
pub fn artifact_filename(item_type: &str, slug: &str, id: ItemId) -> String {
    format!("{item_type}-{slug}-{id}.md")
}

/// The item's own slug, or one derived from its title when the slug is empty.
pub fn effective_slug(slug: &str, title: &str) -> String {
    let slug = slug.trim();
    if slug.is_empty() {
        slugify(title)
    } else {
        slug.to_string()
    }
}

/// URL-style slug: accents transliterated, lowercase ASCII alphanumerics, every
/// other run becomes one `-`.
pub fn slugify(input: &str) -> String {
    let slug = slug::slugify(input);
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Item id encoded in an artifact filename, if it follows the `-{id}.md` convention.
pub fn parse_item_id(filename: &str) -> Option<ItemId> {
    ITEM_ID_SUFFIX
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
