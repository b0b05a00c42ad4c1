use pretty_assertions::assert_eq;
use xmd_core::{
    HighlightError, Highlighter, MathError, MathRenderer, ParseOptions, ParsedState, TagKind,
    UrlError, UrlNormalizer, W_CODE_UNCLOSED, W_MATH_RENDER, parse_with_options, render,
    render_toc,
};
use rstest::rstest;

fn parse(source: &str) -> ParsedState {
    parse_with_options(source, &ParseOptions::default().without_math())
}

fn html(source: &str) -> String {
    render(&parse(source))
}

#[test]
fn escaped_delimiters_stay_literal() {
    let out = html("\\*not emphasis\\*");
    assert!(out.contains("*not emphasis*"), "{out}");
    assert!(!out.contains("<em>"));
}

#[test]
fn footnotes_number_in_citation_order() {
    let out = html("See[^b] and[^a].\n\n[^a]: A def\n[^b]: B def");
    assert!(out.contains("<sup id=\"ref-b\"><a href=\"#def-b\">[1]</a></sup>"), "{out}");
    assert!(out.contains("<sup id=\"ref-a\"><a href=\"#def-a\">[2]</a></sup>"), "{out}");
    assert!(out.contains("<span id=\"def-b\">1. B def</span>"));
    assert!(out.contains("<span id=\"def-a\">2. A def</span>"));
}

#[test]
fn repeated_heading_titles_get_unique_ids() {
    let state = parse("# Intro\n\ntext\n\n# Intro");
    let ids: Vec<&str> = state.headings.iter().map(|heading| heading.id.as_str()).collect();
    assert_eq!(ids, vec!["intro", "intro-1"]);
    assert!(render(&state).contains("<h1 id=\"intro-1\">Intro</h1>"));
}

#[test]
fn nested_list_round_trip() {
    assert_eq!(
        html("- a\n  - b\n- c"),
        "<ul>\n  <li>a</li>\n  <ul>\n    <li>b</li>\n  </ul>\n  <li>c</li>\n</ul>"
    );
}

#[test]
fn table_alignment_applies_to_body_rows() {
    let state = parse("| A | B |\n|:--|--:|\n| 1 | 2 |\n| 3 | 4 |");
    let styles: Vec<Option<&str>> = state
        .tokens
        .iter()
        .filter(|token| token.tag == "td")
        .map(|token| token.attributes.get("style"))
        .collect();
    assert_eq!(
        styles,
        vec![
            Some("text-align: left"),
            Some("text-align: right"),
            Some("text-align: left"),
            Some("text-align: right"),
        ]
    );
}

#[test]
fn unclosed_fence_still_closes_elements() {
    let state = parse("text\n\n```rust\nlet x = 1;");
    let tail: Vec<(&str, TagKind)> = state
        .tokens
        .iter()
        .rev()
        .take(2)
        .map(|token| (token.tag.as_str(), token.kind))
        .collect();
    assert_eq!(tail, vec![("pre", TagKind::Close), ("code", TagKind::Close)]);
    assert_eq!(state.diagnostics.len(), 1);
    assert_eq!(state.diagnostics[0].code, W_CODE_UNCLOSED);
    assert_eq!(state.diagnostics[0].point.line, 3);
}

#[test]
fn forward_reference_link_resolves() {
    let out = html("[text][lbl]\n\n[lbl]: http://x \"t\"");
    assert_eq!(out, "<p>\n  <a href=\"http://x\" title=\"t\">text</a>\n</p>");
}

#[test]
fn tokens_stay_balanced_for_mixed_document() {
    let state = parse(
        "# Title\n\nPara with *em* and [link](#x)\n- one\n  - two\n\n| a |\n|---|\n| b |\n\n```\ncode\n```\n\n[^n]: note",
    );
    let mut stack: Vec<(&str, usize)> = Vec::new();
    for token in &state.tokens {
        match token.kind {
            TagKind::Open => stack.push((token.tag.as_str(), token.depth)),
            TagKind::Close => {
                let (tag, depth) = stack.pop().expect("close without open");
                assert_eq!(tag, token.tag);
                assert_eq!(depth, token.depth);
            }
            _ => {}
        }
    }
    assert!(stack.is_empty());
}

#[test]
fn heading_interrupts_paragraph_and_list() {
    let out = html("para\n## Next\n- item\n### Third");
    assert_eq!(
        out,
        "<p>\n  para\n</p>\n<h2 id=\"next\">Next</h2>\n<ul>\n  <li>item</li>\n</ul>\n<h3 id=\"third\">Third</h3>"
    );
}

struct Upper;

impl Highlighter for Upper {
    fn highlight(&self, code: &str, language: &str) -> Result<String, HighlightError> {
        match language {
            "shout" => Ok(code.to_uppercase()),
            other => Err(HighlightError::UnknownLanguage(other.to_string())),
        }
    }
}

#[test]
fn highlighter_output_is_preserved_and_failures_fall_back() {
    let options = ParseOptions::default().without_math().with_highlighter(&Upper);
    let out = render(&parse_with_options("```shout\n<b>hi</b>\n```\n\n```nope\n<i>\n```", &options));
    assert!(out.contains("<code class=\"language-shout\"><B>HI</B></code>"), "{out}");
    assert!(out.contains("<code class=\"language-nope\">&lt;i&gt;</code>"), "{out}");
}

struct Failing;

impl MathRenderer for Failing {
    fn render(&self, _source: &str, _display: bool) -> Result<String, MathError> {
        Err(MathError::Empty)
    }
}

#[test]
fn math_failure_degrades_to_escaped_source() {
    let options = ParseOptions::default().with_math(&Failing);
    let state = parse_with_options("area $a<b$ here", &options);
    assert!(render(&state).contains("<span class=\"math-inline math-error\">a&lt;b</span>"));
    assert_eq!(state.diagnostics[0].code, W_MATH_RENDER);
}

struct Prefixed;

impl UrlNormalizer for Prefixed {
    fn normalize(&self, raw: &str) -> Result<String, UrlError> {
        if raw.is_empty() {
            return Err(UrlError::Empty);
        }
        Ok(format!("/docs/{raw}"))
    }
}

#[test]
fn custom_url_normalizer_applies_to_all_links() {
    let options = ParseOptions::default().without_math().with_urls(&Prefixed);
    let out = render(&parse_with_options("[a](intro) and [b][r]\n\n[r]: guide", &options));
    assert!(out.contains("<a href=\"/docs/intro\">a</a>"), "{out}");
    assert!(out.contains("<a href=\"/docs/guide\">b</a>"), "{out}");
}

#[test]
fn block_map_covers_source() {
    let state = parse("# A\n\npara\ncontinued\n\n- x");
    let blocks: Vec<(&str, &str, &str)> = state
        .blocks
        .iter()
        .map(|block| (block.id.as_str(), block.created_by.as_str(), block.text.as_str()))
        .collect();
    assert_eq!(
        blocks,
        vec![
            ("markdown-block-0-0", "heading", "# A"),
            ("markdown-block-2-3", "paragraph", "para\ncontinued"),
            ("markdown-block-5-5", "list", "- x"),
        ]
    );
}

#[rstest]
#[case("see [`parse`](https://x.dev) now", "<a href=\"https://x.dev\"><code>parse</code></a>")]
#[case(r"[a\_b](https://x.dev)", "<a href=\"https://x.dev\">a_b</a>")]
#[case(r"[ab](https://x.dev/a\_b)", "<a href=\"https://x.dev/a_b\">ab</a>")]
#[case("[$x$](https://x.dev)", "<a href=\"https://x.dev\"><span class=\"math-inline\">x</span></a>")]
fn links_wrap_claimed_inline_content(#[case] source: &str, #[case] expected: &str) {
    let out = html(source);
    assert!(out.contains(expected), "{out}");
    assert_eq!(out.matches("<a ").count(), 1, "{out}");
}

#[test]
fn definition_line_with_trailing_spaces_leaves_no_empty_paragraph() {
    assert_eq!(
        html("[r]: http://x  \n\n[a][r]"),
        "<p>\n  <a href=\"http://x\">a</a>\n</p>"
    );
}

#[test]
fn empty_list_item_with_continuation() {
    assert_eq!(html("-\n  text"), "<ul>\n  <li>text</li>\n</ul>");
}

#[test]
fn heading_id_and_toc_ignore_citations() {
    let state = parse("# T[^a]\n\ntext\n\n[^a]: note");
    assert_eq!(state.headings[0].id, "t");
    assert_eq!(state.headings[0].text, "T");
    assert!(render_toc(&state).contains("<li><a href=\"#t\">T</a></li>"));
}

#[test]
fn punctuation_labels_resolve_separately() {
    let out = html("[a][!!!] [b][???]\n\n[!!!]: http://one\n[???]: http://two");
    assert!(out.contains("<a href=\"http://one\">a</a>"), "{out}");
    assert!(out.contains("<a href=\"http://two\">b</a>"), "{out}");
}
