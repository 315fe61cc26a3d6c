//! HTML sanitization ahead of Markdown conversion.
//!
//! [`ContentSanitizer::clean`] runs a fixed pipeline of rules. Every rule is a
//! pure `&str -> String` function so it can be tested on its own:
//!
//! 1. [`strip_scripts_and_styles`] drops `<script>`/`<style>` blocks, raw or entity-escaped.
//! 2. [`spans_to_divs`] turns inline spans into block divs.
//! 3. [`remove_comments_and_denylisted`] drops comments and denylisted elements in one tree pass.
//! 4. [`unwrap_headings`] lifts headings out of `<div>`/`<a>` wrappers.
//! 5. [`format_html`] removes empty containers, reflows whitespace and trims block text.
//! 6. [`normalize_links`] fixes anchors and figures for a linear Markdown document.
//!
//! Malformed markup never fails the pipeline; the parser recovers as a browser would.

use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::{Captures, Regex};
use scraper::{Html, Node};

pub const DEFAULT_DENYLISTED_CLASSES: &[&str] = &["u-preloader"];

const HEADING_UNWRAP_PASSES: usize = 3;
const MAX_EMPTY_CONTAINER_PASSES: usize = 32;
const BLOCK_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "div", "ul", "ol", "blockquote",
];
const TRIMMED_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "p", "div"];

// Hardcoded patterns; compiled once on first use.

static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("STYLE_RE: hardcoded regex is valid")
});

static ESCAPED_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)&lt;style\b.*?&gt;.*?&lt;/style\s*&gt;")
        .expect("ESCAPED_STYLE_RE: hardcoded regex is valid")
});

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>")
        .expect("SCRIPT_RE: hardcoded regex is valid")
});

static ESCAPED_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)&lt;script\b.*?&gt;.*?&lt;/script\s*&gt;")
        .expect("ESCAPED_SCRIPT_RE: hardcoded regex is valid")
});

static SPAN_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<span(\s|>)").expect("SPAN_OPEN_RE: hardcoded regex is valid")
});

static SPAN_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</span\s*>").expect("SPAN_CLOSE_RE: hardcoded regex is valid")
});

static HEADING_WRAPPER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:div|a)\b[^>]*>\s*(<h[1-6]\b[^>]*>.*?</h[1-6]\s*>)")
        .expect("HEADING_WRAPPER_RE: hardcoded regex is valid")
});

static EMPTY_CONTAINER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(div|p)\b[^>]*>\s*</(div|p)\s*>")
        .expect("EMPTY_CONTAINER_RE: hardcoded regex is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE: hardcoded regex is valid"));

static INTER_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("INTER_TAG_RE: hardcoded regex is valid"));

static MULTI_NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("MULTI_NEWLINE_RE: hardcoded regex is valid"));

/// `(open, close, tag)` per block tag, in [`BLOCK_TAGS`] order.
static BLOCK_TAG_RES: LazyLock<Vec<(Regex, Regex, &'static str)>> = LazyLock::new(|| {
    BLOCK_TAGS
        .iter()
        .map(|tag| {
            let open = Regex::new(&format!(r"(?i)<{tag}\b[^>]*>"))
                .expect("block open: hardcoded regex is valid");
            let close = Regex::new(&format!(r"(?i)</{tag}\s*>"))
                .expect("block close: hardcoded regex is valid");
            (open, close, *tag)
        })
        .collect()
});

static HASH_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']#[^"']*["'][^>]*>(.*?)</a\s*>"#)
        .expect("HASH_LINK_RE: hardcoded regex is valid")
});

static FIGURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<figure\b[^>]*>(.*?)</figure\s*>")
        .expect("FIGURE_RE: hardcoded regex is valid")
});

static IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("IMG_RE: hardcoded regex is valid"));

static LINK_AROUND_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\s+([^>]+)>\s*<h([1-6])([^>]*)>(.*?)</h([1-6])\s*>\s*</a\s*>")
        .expect("LINK_AROUND_HEADING_RE: hardcoded regex is valid")
});

static LINK_AROUND_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\s+([^>]+)>(.*?)<h([1-6])([^>]*)>(.*?)</h([1-6])\s*>(.*?)</a\s*>")
        .expect("LINK_AROUND_BLOCK_RE: hardcoded regex is valid")
});

static NESTED_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<a\b").expect("NESTED_LINK_RE: hardcoded regex is valid"));

static LINK_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</a\s*>").expect("LINK_CLOSE_RE: hardcoded regex is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("TAG_RE: hardcoded regex is valid"));

/// Cleans raw item HTML into a predictable intermediate form for conversion.
#[derive(Debug, Clone)]
pub struct ContentSanitizer {
    denylisted_classes: Vec<String>,
}

impl Default for ContentSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLISTED_CLASSES.iter().map(|c| c.to_string()).collect())
    }
}

impl ContentSanitizer {
    pub fn new(denylisted_classes: Vec<String>) -> Self {
        Self { denylisted_classes }
    }

    pub fn denylisted_classes(&self) -> &[String] {
        &self.denylisted_classes
    }

    pub fn clean(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let html = strip_scripts_and_styles(html);
        let html = spans_to_divs(&html);
        let html = remove_comments_and_denylisted(&html, &self.denylisted_classes);
        let html = unwrap_headings(&html);
        let html = format_html(&html);
        normalize_links(&html)
    }
}

/// Remove `<style>`/`<script>` elements with their content, including `&lt;style&gt;` text.
pub fn strip_scripts_and_styles(html: &str) -> String {
    let html = STYLE_RE.replace_all(html, "");
    let html = ESCAPED_STYLE_RE.replace_all(&html, "");
    let html = SCRIPT_RE.replace_all(&html, "");
    ESCAPED_SCRIPT_RE.replace_all(&html, "").into_owned()
}

/// `<span ...>` becomes `<div ...>`; attributes are kept.
pub fn spans_to_divs(html: &str) -> String {
    let html = SPAN_OPEN_RE.replace_all(html, "<div${1}");
    SPAN_CLOSE_RE.replace_all(&html, "</div>").into_owned()
}

/// Drop comments, any leftover script/style element, and every element whose class
/// list contains a denylisted class (with all descendants).
pub fn remove_comments_and_denylisted(html: &str, denylisted_classes: &[String]) -> String {
    let mut fragment = Html::parse_fragment(html);
    let doomed: Vec<NodeId> = fragment
        .tree
        .nodes()
        .filter(|node| match node.value() {
            Node::Comment(_) => true,
            Node::Element(element) => {
                matches!(element.name(), "script" | "style")
                    || element
                        .classes()
                        .any(|class| denylisted_classes.iter().any(|d| d == class))
            }
            _ => false,
        })
        .map(|node| node.id())
        .collect();

    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }
    fragment.root_element().inner_html()
}

/// Strip `<div>`/`<a>` opening tags that directly precede a heading, up to three levels deep.
pub fn unwrap_headings(html: &str) -> String {
    let mut current = html.to_string();
    for _ in 0..HEADING_UNWRAP_PASSES {
        let next = HEADING_WRAPPER_RE.replace_all(&current, "${1}");
        if next == current {
            break;
        }
        current = next.into_owned();
    }
    current
}

/// Remove empty containers, reflow whitespace, put block tags on their own lines and
/// trim the inner text of headings, paragraphs and divs.
pub fn format_html(html: &str) -> String {
    let html = remove_empty_containers(html);
    let html = collapse_whitespace(&html);
    let html = add_block_newlines(&html);
    let html = MULTI_NEWLINE_RE.replace_all(&html, "\n");
    trim_block_text(&html).trim().to_string()
}

/// Repeatedly remove `<div>`/`<p>` elements holding only whitespace, so containers of
/// empty containers disappear too.
pub fn remove_empty_containers(html: &str) -> String {
    let mut current = html.to_string();
    for _ in 0..MAX_EMPTY_CONTAINER_PASSES {
        let next = EMPTY_CONTAINER_RE
            .replace_all(&current, |caps: &Captures| {
                if caps[1].eq_ignore_ascii_case(&caps[2]) {
                    String::new()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Any whitespace run becomes one space; whitespace between tags disappears.
pub fn collapse_whitespace(html: &str) -> String {
    let html = WHITESPACE_RE.replace_all(html, " ");
    INTER_TAG_RE.replace_all(&html, "><").into_owned()
}

/// Newline before each block opening tag and after each block closing tag.
/// Opening tags lose their attributes.
pub fn add_block_newlines(html: &str) -> String {
    let mut current = html.to_string();
    for (open, close, tag) in BLOCK_TAG_RES.iter() {
        let closed = close.replace_all(&current, format!("</{tag}>\n").as_str());
        current = open
            .replace_all(&closed, format!("\n<{tag}>").as_str())
            .into_owned();
    }
    current
}

/// Trim leading whitespace of the first and trailing whitespace of the last text child
/// of every heading, paragraph and div.
pub fn trim_block_text(html: &str) -> String {
    let mut fragment = Html::parse_fragment(html);
    let blocks: Vec<NodeId> = fragment
        .tree
        .nodes()
        .filter(|node| matches!(node.value(), Node::Element(el) if TRIMMED_TAGS.contains(&el.name())))
        .map(|node| node.id())
        .collect();

    for id in blocks {
        let Some(block) = fragment.tree.get(id) else {
            continue;
        };
        let first = block.first_child().map(|child| child.id());
        let last = block.last_child().map(|child| child.id());
        if let Some(first) = first {
            trim_text_node(&mut fragment, first, str::trim_start);
        }
        if let Some(last) = last {
            trim_text_node(&mut fragment, last, str::trim_end);
        }
    }
    fragment.root_element().inner_html()
}

fn trim_text_node(fragment: &mut Html, id: NodeId, trim: fn(&str) -> &str) {
    if let Some(mut node) = fragment.tree.get_mut(id) {
        if let Node::Text(text) = node.value() {
            let trimmed = trim(&text.text).to_string();
            text.text = trimmed.into();
        }
    }
}

/// Anchor/figure clean-up run on the formatted HTML.
pub fn normalize_links(html: &str) -> String {
    let html = remove_hash_links(html);
    let html = keep_first_figure_image(&html);
    move_links_into_headings(&html)
}

/// In-page anchors (`href="#..."`) are replaced by their inner content.
pub fn remove_hash_links(html: &str) -> String {
    HASH_LINK_RE.replace_all(html, "${1}").into_owned()
}

/// Inside each `<figure>`, only the first `<img>` survives and moves to the front.
pub fn keep_first_figure_image(html: &str) -> String {
    FIGURE_RE
        .replace_all(html, |caps: &Captures| {
            let inner = &caps[1];
            match IMG_RE.find(inner) {
                Some(first) => {
                    let rest = IMG_RE.replace_all(inner, "");
                    format!("<figure>{}{}</figure>", first.as_str(), rest)
                }
                None => format!("<figure>{inner}</figure>"),
            }
        })
        .into_owned()
}

/// `<a ..><h2>T</h2></a>` becomes `<h2><a ..>T</a></h2>`. A link around filler markup
/// plus a heading is moved onto the heading text, unless the heading already holds a
/// link or the filler carries visible text.
pub fn move_links_into_headings(html: &str) -> String {
    let html = LINK_AROUND_HEADING_RE.replace_all(html, |caps: &Captures| {
        if caps[2] != caps[5] {
            return caps[0].to_string();
        }
        format!(
            "<h{level}{attrs}><a {link}>{text}</a></h{level}>",
            level = &caps[2],
            attrs = &caps[3],
            link = &caps[1],
            text = &caps[4],
        )
    });

    LINK_AROUND_BLOCK_RE
        .replace_all(&html, |caps: &Captures| {
            let heading_text = &caps[5];
            let before = &caps[2];
            let after = &caps[7];
            // A close before the heading or an open after it means the match
            // spans two separate links.
            if caps[3] != caps[6]
                || heading_text.trim().is_empty()
                || NESTED_LINK_RE.is_match(heading_text)
                || LINK_CLOSE_RE.is_match(before)
                || NESTED_LINK_RE.is_match(after)
                || has_visible_text(before)
            {
                return caps[0].to_string();
            }
            format!(
                "{before}<h{level}{attrs}><a {link}>{text}</a></h{level}>{after}",
                before = before,
                level = &caps[3],
                attrs = &caps[4],
                link = &caps[1],
                text = heading_text,
                after = after,
            )
        })
        .into_owned()
}

fn has_visible_text(html: &str) -> bool {
    TAG_RE
        .replace_all(html, "")
        .chars()
        .any(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_text_ignores_markup() {
        assert!(!has_visible_text("<div><img src=\"a.jpg\"></div>\n"));
        assert!(has_visible_text("<div>Read more</div>"));
    }

    #[test]
    fn block_newlines_drop_attributes_but_not_pre() {
        let out = add_block_newlines(r#"<p class="x">a</p><pre>b</pre>"#);
        assert_eq!(out, "\n<p>a</p>\n<pre>b</pre>");
    }
}
