use pretty_assertions::assert_eq;
use proptest::prelude::*;
use worddown_engine::{clean_markdown, setext_to_atx, Converter, MarkdownConverter};

struct FailingBackend;

impl Converter for FailingBackend {
    fn convert(&self, _html: &str) -> Option<String> {
        None
    }
}

struct EchoBackend(&'static str);

impl Converter for EchoBackend {
    fn convert(&self, _html: &str) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[test]
fn headings_come_out_in_atx_form() {
    let md = MarkdownConverter::default().to_markdown("<h1>Hello</h1>\n<p>world</p>");
    assert!(md.starts_with("# Hello"), "unexpected markdown: {md:?}");
    assert!(md.ends_with("world"), "unexpected markdown: {md:?}");
}

#[test]
fn paragraphs_are_separated_by_one_blank_line() {
    let md = MarkdownConverter::default().to_markdown("<p>A</p>\n<p>B</p>");
    assert_eq!(md, "A\n\nB");
}

#[test]
fn backend_failure_returns_sanitized_html() {
    let converter = MarkdownConverter::new(Box::new(FailingBackend));
    assert_eq!(converter.to_markdown("<p>keep</p>"), "<p>keep</p>");
}

#[test]
fn backend_output_is_post_processed() {
    let converter = MarkdownConverter::new(Box::new(EchoBackend("Title\n=====\nBody\r\n\r\n\r\n\r\nEnd  \n")));
    assert_eq!(converter.to_markdown("<p>ignored</p>"), "# Title\n\nBody\n\nEnd");
}

#[test]
fn setext_headings_become_atx() {
    assert_eq!(setext_to_atx("Top\n===\ntext\nSub\n---"), "# Top\ntext\n## Sub");
    // Not a heading: list item, and lines inside a fence.
    assert_eq!(setext_to_atx("- item\n---"), "- item\n---");
    assert_eq!(setext_to_atx("```\ncode\n===\n```"), "```\ncode\n===\n```");
}

#[test]
fn blank_runs_collapse_and_line_endings_unify() {
    assert_eq!(clean_markdown("\r\n\r\nA\r\n\r\n\r\n\r\nB\rC\n\n\n"), "A\n\nB\nC");
}

#[test]
fn block_elements_get_exactly_one_blank_line() {
    let input = "# Title\nIntro line\n- one\n- two\n  continued\n> quote\n> more\n| a | b |\n|---|---|\n![img](a.png)\n---\nTail";
    let expected = "# Title\n\nIntro line\n\n- one\n- two\n  continued\n\n> quote\n> more\n\n| a | b |\n|---|---|\n\n![img](a.png)\n\n---\n\nTail";
    assert_eq!(clean_markdown(input), expected);
}

#[test]
fn fenced_code_is_left_verbatim() {
    let input = "Before\n```\nline\n\n\n\n# not a heading\n```\nAfter";
    assert_eq!(
        clean_markdown(input),
        "Before\n\n```\nline\n\n\n\n# not a heading\n```\n\nAfter"
    );
}

#[test]
fn standalone_emphasis_and_code_lines_are_separated() {
    assert_eq!(
        clean_markdown("text\n**Bold line**\n`code`\nmore text"),
        "text\n\n**Bold line**\n\n`code`\n\nmore text"
    );
}

fn markdown_line() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "# Heading",
        "## Sub",
        "plain text",
        "another sentence.",
        "- item",
        "* item",
        "1. first",
        "  continued",
        "\tindented",
        "> quote",
        "| a | b |",
        "---",
        "* * *",
        "```",
        "~~~",
        "![alt](a.png)",
        "[link](https://example.com)",
        "**bold**",
        "_italic_",
        "`code`",
        "",
        "   ",
        "trailing  ",
        "\r",
        "====",
    ])
}

proptest! {
    #[test]
    fn clean_markdown_is_idempotent(lines in prop::collection::vec(markdown_line(), 0..30), crlf in any::<bool>()) {
        let input = lines.join(if crlf { "\r\n" } else { "\n" });
        let once = clean_markdown(&input);
        let twice = clean_markdown(&once);
        prop_assert_eq!(once, twice);
    }
}
