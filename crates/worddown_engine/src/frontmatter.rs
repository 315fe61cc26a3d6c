use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RESERVED_WORDS: &[&str] = &[
    "true", "false", "yes", "no", "on", "off", "y", "n", "null", "~",
];

static PLAIN_SCALAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_./-]*$").expect("PLAIN_SCALAR: hardcoded regex is valid")
});
static DATE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("DATE_LIKE: hardcoded regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterValue {
    Text(String),
    Integer(u64),
    List(Vec<String>),
}

/// Ordered key/value metadata emitted as the YAML block of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrontMatter {
    entries: Vec<(String, FrontMatterValue)>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`. Replacing keeps the key's original position.
    pub fn insert(&mut self, key: impl Into<String>, value: FrontMatterValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FrontMatterValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn to_yaml(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            if !out.is_empty() {
                out.push('\n');
            }
            match value {
                FrontMatterValue::Integer(n) => {
                    let _ = write!(out, "{key}: {n}");
                }
                FrontMatterValue::Text(text) => {
                    let _ = write!(out, "{key}: {}", yaml_scalar(text, 2));
                }
                FrontMatterValue::List(items) if items.is_empty() => {
                    let _ = write!(out, "{key}: []");
                }
                FrontMatterValue::List(items) => {
                    let _ = write!(out, "{key}:");
                    for item in items {
                        let _ = write!(out, "\n  - {}", yaml_scalar(item, 4));
                    }
                }
            }
        }
        out
    }
}

/// Front matter for one item, keys in artifact order.
pub fn item_front_matter(item: &crate::ContentItem, slug: &str) -> FrontMatter {
    let mut fm = FrontMatter::new();
    fm.insert(
        "date",
        FrontMatterValue::Text(item.created_at.format(DATE_FORMAT).to_string()),
    );
    fm.insert(
        "modified",
        FrontMatterValue::Text(item.modified_at.format(DATE_FORMAT).to_string()),
    );
    fm.insert("slug", FrontMatterValue::Text(slug.to_string()));
    fm.insert("id", FrontMatterValue::Integer(item.id));
    fm.insert("type", FrontMatterValue::Text(item.item_type.clone()));
    fm.insert("excerpt", FrontMatterValue::Text(item.excerpt.clone()));
    fm.insert("permalink", FrontMatterValue::Text(item.permalink.clone()));
    if !item.categories.is_empty() {
        fm.insert("category", FrontMatterValue::List(item.categories.clone()));
    }
    fm
}

/// `---` fenced front matter, the title as an H1, then the body; ends with one newline.
pub fn build_markdown_document(title: &str, front_matter: &FrontMatter, body_markdown: &str) -> String {
    let doc = format!(
        "---\n{yaml}\n---\n\n# {title}\n\n{body}",
        yaml = front_matter.to_yaml().trim_end(),
        title = title,
        body = body_markdown,
    );
    let mut doc = doc.trim_end().to_string();
    doc.push('\n');
    doc
}

fn yaml_scalar(value: &str, indent: usize) -> String {
    if is_plain(value) {
        return value.to_string();
    }
    if value.contains('\n') && can_use_literal_block(value) {
        return literal_block(value, indent);
    }
    double_quoted(value)
}

fn is_plain(value: &str) -> bool {
    PLAIN_SCALAR.is_match(value)
        && !RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(value))
        && value.parse::<f64>().is_err()
        && !DATE_LIKE.is_match(value)
        && !value.starts_with("0x")
        && !value.starts_with("0o")
}

fn can_use_literal_block(value: &str) -> bool {
    !value.starts_with([' ', '\t'])
        && value
            .chars()
            .all(|c| c == '\n' || c == '\t' || !c.is_control())
}

fn literal_block(value: &str, indent: usize) -> String {
    let chomp = if value.ends_with('\n') { "" } else { "-" };
    let pad = " ".repeat(indent);
    let mut out = format!("|{chomp}");
    for line in value.strip_suffix('\n').unwrap_or(value).split('\n') {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&pad);
            out.push_str(line);
        }
    }
    out
}

fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
