use pretty_assertions::assert_eq;
use proptest::prelude::*;
use worddown_engine::sanitize::{
    add_block_newlines, collapse_whitespace, keep_first_figure_image, move_links_into_headings,
    remove_comments_and_denylisted, remove_empty_containers, remove_hash_links, spans_to_divs,
    strip_scripts_and_styles, trim_block_text, unwrap_headings,
};
use worddown_engine::{ContentSanitizer, MarkdownConverter};

#[test]
fn style_is_dropped_and_span_becomes_div() {
    let sanitizer = ContentSanitizer::default();
    let clean = sanitizer.clean("<style>.x{}</style><p>Hello <span>World</span></p>");

    assert!(!clean.contains("<style"));
    assert!(clean.contains("<div>World</div>"), "{clean}");
    assert_eq!(clean, "<p>Hello</p>\n<div>World</div>");

    let markdown = MarkdownConverter::default().to_markdown(&clean);
    let words: Vec<&str> = markdown.split_whitespace().collect();
    assert_eq!(words.join(" "), "Hello World");
}

#[test]
fn figure_keeps_only_its_first_image() {
    let clean = ContentSanitizer::default()
        .clean(r#"<figure><img src="a.jpg"><img src="b.jpg"></figure>"#);
    assert_eq!(clean, r#"<figure><img src="a.jpg"></figure>"#);
}

#[test]
fn empty_input_gives_empty_output() {
    assert_eq!(ContentSanitizer::default().clean(""), "");
    assert_eq!(ContentSanitizer::default().clean("  \n "), "");
}

#[test]
fn plain_text_passes_through() {
    assert_eq!(ContentSanitizer::default().clean("  just   text "), "just text");
}

#[test]
fn preloader_and_comments_are_removed_with_children() {
    let clean = ContentSanitizer::default().clean(
        r#"<div class="u-preloader"><div class="u-preloader">Loading</div></div><!-- note --><p>Body</p>"#,
    );
    assert_eq!(clean, "<p>Body</p>");
}

#[test]
fn custom_denylist_matches_any_listed_class() {
    let sanitizer = ContentSanitizer::new(vec!["ad".to_string()]);
    let clean = sanitizer.clean(r#"<div class="promo ad"><p>Buy</p></div><p>Keep</p>"#);
    assert_eq!(clean, "<p>Keep</p>");
}

#[test]
fn heading_wrapped_in_div_and_link_loses_wrappers() {
    let clean = ContentSanitizer::default()
        .clean(r#"<div class="wrap"><a href="/x"><h2>Title</h2></a></div>"#);
    assert_eq!(clean, "<h2>Title</h2>");
}

#[test]
fn escaped_scripts_and_styles_are_removed() {
    let html = "&lt;style&gt;.a{}&lt;/style&gt;<p>x</p>&lt;script type=\"a\"&gt;run()&lt;/script&gt;";
    assert_eq!(strip_scripts_and_styles(html), "<p>x</p>");
    assert_eq!(
        strip_scripts_and_styles("<SCRIPT src=\"a.js\">\nx\n</script ><p>y</p>"),
        "<p>y</p>"
    );
}

#[test]
fn spans_become_divs_with_attributes() {
    assert_eq!(
        spans_to_divs(r#"<span class="a">x</span><span>y</span>"#),
        r#"<div class="a">x</div><div>y</div>"#
    );
}

#[test]
fn tree_pass_drops_comments_and_stray_scripts() {
    let out = remove_comments_and_denylisted("<p>a<!-- c --></p><script>x()</script>", &[]);
    assert_eq!(out, "<p>a</p>");
}

#[test]
fn unwrap_headings_handles_three_levels() {
    assert_eq!(
        unwrap_headings(r#"<div class="wrap"><a href="/x"><h2>Title</h2></a></div>"#),
        "<h2>Title</h2></a></div>"
    );
    assert_eq!(unwrap_headings("<abbr><h2>T</h2></abbr>"), "<abbr><h2>T</h2></abbr>");
}

#[test]
fn nested_empty_containers_disappear() {
    assert_eq!(
        remove_empty_containers("<div><div> </div><p></p></div><p>x</p>"),
        "<p>x</p>"
    );
}

#[test]
fn whitespace_is_collapsed_between_and_inside_tags() {
    assert_eq!(
        collapse_whitespace("<p>a\n\n  b</p>\n  <p>c</p>"),
        "<p>a b</p><p>c</p>"
    );
}

#[test]
fn block_tags_get_their_own_lines() {
    assert_eq!(
        add_block_newlines("<h2 id=\"x\">T</h2><ul><li>a</li></ul>"),
        "\n<h2>T</h2>\n\n<ul><li>a</li></ul>\n"
    );
}

#[test]
fn block_text_is_trimmed_at_the_edges_only() {
    assert_eq!(
        trim_block_text("<p> Hello <b>big</b> world </p><h3> T </h3>"),
        "<p>Hello <b>big</b> world</p><h3>T</h3>"
    );
}

#[test]
fn hash_links_keep_their_text() {
    assert_eq!(
        remove_hash_links(r##"<p><a href="#top">Back</a> <a href="/x">X</a></p>"##),
        r#"<p>Back <a href="/x">X</a></p>"#
    );
}

#[test]
fn figure_without_images_is_kept() {
    assert_eq!(
        keep_first_figure_image(r#"<figure class="f"><figcaption>c</figcaption></figure>"#),
        "<figure><figcaption>c</figcaption></figure>"
    );
}

#[test]
fn link_around_heading_moves_inside() {
    assert_eq!(
        move_links_into_headings(r#"<a href="/post"><h2 class="t">Title</h2></a>"#),
        r#"<h2 class="t"><a href="/post">Title</a></h2>"#
    );
}

#[test]
fn link_around_filler_and_heading_moves_onto_heading() {
    assert_eq!(
        move_links_into_headings(
            r#"<a href="/post"><div><img src="a.jpg"></div><h3>Title</h3><p>teaser</p></a>"#
        ),
        r#"<div><img src="a.jpg"></div><h3><a href="/post">Title</a></h3><p>teaser</p>"#
    );
}

#[test]
fn link_with_visible_text_before_heading_is_left_alone() {
    let html = r#"<a href="/post"><div>Read</div><h3>Title</h3></a>"#;
    assert_eq!(move_links_into_headings(html), html);
}

#[test]
fn link_with_empty_heading_is_left_alone() {
    let html = r#"<a href="/post"><div></div><h3> </h3></a>"#;
    assert_eq!(move_links_into_headings(html), html);
}

#[test]
fn separate_links_around_a_heading_are_left_alone() {
    let html = concat!(
        r#"<p><a href="/gallery"><img src="a.jpg"></a></p>"#,
        "<h2>Unrelated Heading</h2>",
        r#"<p><a href="/more">Read more</a> and trailing text</p>"#,
    );
    assert_eq!(move_links_into_headings(html), html);

    let clean = ContentSanitizer::default().clean(html);
    assert!(clean.contains(r#"<a href="/gallery"><img src="a.jpg"></a>"#), "{clean}");
    assert!(clean.contains("<h2>Unrelated Heading</h2>"), "{clean}");
    assert!(clean.contains(r#"<a href="/more">Read more</a> and trailing text"#), "{clean}");
}

fn fragment_piece() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "<script>",
        "</script>",
        "<script type=\"text/javascript\">alert(1)</script>",
        "<SCRIPT>",
        "<style>",
        "</style>",
        "<style>.x{color:red}</style>",
        "&lt;style&gt;",
        "&lt;/style&gt;",
        "<!--",
        "-->",
        "<p>",
        "</p>",
        "<span>",
        "</span>",
        "<div class=\"u-preloader\">",
        "<div>",
        "</div>",
        "<h2>",
        "</h2>",
        "<a href=\"#x\">",
        "<a href=\"/y\">",
        "</a>",
        "<figure>",
        "</figure>",
        "<img src=\"a.jpg\">",
        "text",
        " ",
        "\n",
    ])
}

proptest! {
    #[test]
    fn clean_never_leaves_script_or_style(pieces in prop::collection::vec(fragment_piece(), 0..40)) {
        let html = pieces.concat();
        let clean = ContentSanitizer::default().clean(&html).to_ascii_lowercase();
        prop_assert!(!clean.contains("<script"), "script survived: {}", clean);
        prop_assert!(!clean.contains("<style"), "style survived: {}", clean);
    }
}
