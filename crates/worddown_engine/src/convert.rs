use std::panic;
use std::sync::LazyLock;

use engine_logging::engine_warn;
use regex::Regex;

static SETEXT_H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=+\s*$").expect("SETEXT_H1: hardcoded regex is valid"));
static SETEXT_H2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-+\s*$").expect("SETEXT_H2: hardcoded regex is valid"));
static ATX_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}(\s|$)").expect("ATX_HEADING: hardcoded regex is valid"));
static HORIZONTAL_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$")
        .expect("HORIZONTAL_RULE: hardcoded regex is valid")
});
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+]|\d{1,9}[.)])(?:\s|$)").expect("LIST_ITEM: hardcoded regex is valid")
});
static STANDALONE_INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:!?\[[^\]]*\]\([^)]*\)|\*\*.+\*\*|__.+__|\*[^*\s].*\*|_[^_\s].*_|`[^`]+`)$",
    )
    .expect("STANDALONE_INLINE: hardcoded regex is valid")
});

/// HTML to Markdown backend. `None` means the backend could not convert the input.
pub trait Converter: Send + Sync {
    fn convert(&self, html: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn convert(&self, html: &str) -> Option<String> {
        // html2md panics on some malformed trees.
        panic::catch_unwind(|| html2md::parse_html(html)).ok()
    }
}

/// Sanitized HTML to cleaned Markdown, falling back to the HTML itself when the
/// backend fails.
pub struct MarkdownConverter {
    backend: Box<dyn Converter>,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new(Box::new(Html2MdConverter))
    }
}

impl MarkdownConverter {
    pub fn new(backend: Box<dyn Converter>) -> Self {
        Self { backend }
    }

    pub fn to_markdown(&self, html: &str) -> String {
        match self.backend.convert(html) {
            Some(markdown) => clean_markdown(&setext_to_atx(&markdown)),
            None => {
                engine_warn!("markdown conversion failed; keeping sanitized html");
                html.to_string()
            }
        }
    }
}

/// Rewrite `Title\n===` / `Title\n---` headings as `# Title` / `## Title`.
/// Lines inside fenced code blocks are left alone.
pub fn setext_to_atx(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut fence: Option<char> = None;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if let Some(marker) = fence_marker(line) {
            match fence {
                None => fence = Some(marker),
                Some(open) if open == marker => fence = None,
                Some(_) => {}
            }
            out.push(line.to_string());
            i += 1;
            continue;
        }
        if fence.is_none() {
            if let Some(next) = lines.get(i + 1) {
                let text = line.trim();
                let level = if SETEXT_H1.is_match(next) {
                    Some("#")
                } else if SETEXT_H2.is_match(next) {
                    Some("##")
                } else {
                    None
                };
                if let Some(level) = level {
                    if can_be_setext_text(line) {
                        out.push(format!("{level} {text}"));
                        i += 2;
                        continue;
                    }
                }
            }
        }
        out.push(line.to_string());
        i += 1;
    }
    out.join("\n")
}

fn can_be_setext_text(line: &str) -> bool {
    let text = line.trim();
    !text.is_empty()
        && !line.starts_with("    ")
        && !line.starts_with('\t')
        && !ATX_HEADING.is_match(text)
        && !LIST_ITEM.is_match(text)
        && !HORIZONTAL_RULE.is_match(text)
        && !text.starts_with('>')
        && !text.starts_with('|')
}

fn fence_marker(line: &str) -> Option<char> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some('`')
    } else if trimmed.starts_with("~~~") {
        Some('~')
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Heading,
    Rule,
    Fence,
    ListItem,
    ListContinuation,
    Blockquote,
    TableRow,
    Standalone,
    Paragraph,
}

impl LineKind {
    fn stands_alone(self) -> bool {
        matches!(
            self,
            LineKind::Heading | LineKind::Rule | LineKind::Fence | LineKind::Standalone
        )
    }

    fn is_list(self) -> bool {
        matches!(self, LineKind::ListItem | LineKind::ListContinuation)
    }
}

fn classify(line: &str, prev: Option<LineKind>) -> LineKind {
    let text = line.trim();
    let indented = line.starts_with("  ") || line.starts_with('\t');
    if indented && prev.is_some_and(LineKind::is_list) && !LIST_ITEM.is_match(text) {
        return LineKind::ListContinuation;
    }
    if ATX_HEADING.is_match(text) {
        LineKind::Heading
    } else if HORIZONTAL_RULE.is_match(text) {
        LineKind::Rule
    } else if LIST_ITEM.is_match(text) {
        LineKind::ListItem
    } else if text.starts_with('>') {
        LineKind::Blockquote
    } else if text.starts_with('|') {
        LineKind::TableRow
    } else if STANDALONE_INLINE.is_match(text) {
        LineKind::Standalone
    } else {
        LineKind::Paragraph
    }
}

fn needs_blank_between(prev: LineKind, next: LineKind) -> bool {
    if prev.stands_alone() || next.stands_alone() {
        return true;
    }
    if prev.is_list() && next.is_list() {
        return false;
    }
    prev != next
}

/// Normalize spacing of converted Markdown.
///
/// Line endings become `\n`, blank runs collapse to a single blank line, and block
/// constructs (headings, rules, fences, standalone images/links/emphasis/code, lists,
/// quotes, tables) are separated from neighbouring blocks by exactly one blank line.
/// Consecutive lines of the same list, quote, table or paragraph stay together. Fenced
/// code is copied verbatim. The result is trimmed and `clean_markdown` is idempotent.
pub fn clean_markdown(markdown: &str) -> String {
    let normalized = markdown.replace("\r\n", "\n").replace('\r', "\n");
    let mut out: Vec<&str> = Vec::new();
    let mut prev: Option<LineKind> = None;
    let mut pending_blank = false;
    let mut fence: Option<char> = None;

    for line in normalized.split('\n') {
        if let Some(open) = fence {
            out.push(line);
            if fence_marker(line) == Some(open) {
                fence = None;
                prev = Some(LineKind::Fence);
                pending_blank = false;
            }
            continue;
        }

        if line.trim().is_empty() {
            pending_blank = true;
            continue;
        }

        let kind = match fence_marker(line) {
            Some(marker) => {
                fence = Some(marker);
                LineKind::Fence
            }
            None => classify(line, prev),
        };

        if let Some(prev_kind) = prev {
            if pending_blank || needs_blank_between(prev_kind, kind) {
                out.push("");
            }
        }
        out.push(line);
        prev = Some(kind);
        pending_blank = false;
    }

    out.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indented_line_after_list_item_continues_the_list() {
        assert_eq!(
            classify("  more", Some(LineKind::ListItem)),
            LineKind::ListContinuation
        );
        assert_eq!(classify("  more", Some(LineKind::Paragraph)), LineKind::Paragraph);
    }

    #[test]
    fn bold_is_not_a_list_item() {
        assert_eq!(classify("**bold**", None), LineKind::Standalone);
        assert_eq!(classify("* item", None), LineKind::ListItem);
        assert_eq!(classify("* * *", None), LineKind::Rule);
    }
}
