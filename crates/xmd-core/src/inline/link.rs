use once_cell::sync::Lazy;
use regex::Regex;

use super::{InlineRule, InlineState};
use crate::diagnostic::W_URL_INVALID;
use crate::document::{PendingLink, TokenRef};
use crate::token::InlineToken;

static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\[\]]*)\]\(\s*([^\s()]*)(?:\s+"([^"]*)")?\s*\)"#).unwrap()
});
static BRACKET_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})>>").unwrap());
static BRACKET_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<((?:[a-zA-Z][a-zA-Z0-9+.-]*://|www\.|mailto:)[^<>\s]+)>").unwrap()
});
static REFERENCE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]^][^\[\]]*)\]\[([^\[\]]*)\]").unwrap());
static REFERENCE_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*\[([^\[\]^][^\[\]]*)\]:\s+(\S+)(?:\s+"([^"]*)")?\s*$"#).unwrap()
});
static AUTOLINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:https?://[^\s<>\[\]()]+|www\.[^\s<>\[\]()]+|[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})",
    )
    .unwrap()
});

/// Normalizes a link target, falling back to the raw text with a warning.
fn link_target(state: &mut InlineState<'_>, raw: &str, pos: usize) -> String {
    match state.options.urls.normalize(raw) {
        Ok(url) => url,
        Err(err) => {
            state.warn(pos, W_URL_INVALID, err.to_string());
            raw.to_string()
        }
    }
}

/// Drops the backslash of escaped ASCII punctuation.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match chars.next_if(|next| ch == '\\' && next.is_ascii_punctuation()) {
            Some(escaped) => out.push(escaped),
            None => out.push(ch),
        }
    }
    out
}

fn inside_link(state: &InlineState<'_>, pos: usize) -> bool {
    state.enclosing(pos).is_some_and(|token| token.tag == "a")
}

/// `[text](url "title")`.
pub struct Link;

impl InlineRule for Link {
    fn name(&self) -> &'static str {
        "link"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let mut matched = false;
        for captures in state.match_spans(&LINK, &[1], &[2, 3]) {
            let (Some(whole), Some(text), Some(url)) = (captures.get(0), captures.get(1), captures.get(2))
            else {
                continue;
            };
            let href = link_target(state, &unescape(url.as_str()), url.start());
            let mut open = InlineToken::open("a", whole.start(), text.start(), self.name())
                .with_attribute("href", href);
            if let Some(title) = captures.get(3) {
                open = open.with_attribute("title", unescape(title.as_str()));
            }
            if !state.add(open) {
                continue;
            }
            state.add_over(InlineToken::close("a", text.end(), whole.end(), self.name()));
            matched = true;
        }
        matched
    }
}

/// `<<someone@example.com>>` and `<https://example.com>`.
pub struct BracketLink;

impl InlineRule for BracketLink {
    fn name(&self) -> &'static str {
        "bracket_link"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let mut matched = false;
        for regex in [&*BRACKET_EMAIL, &*BRACKET_URL] {
            for captures in state.match_all(regex) {
                let (Some(whole), Some(target)) = (captures.get(0), captures.get(1)) else {
                    continue;
                };
                let href = link_target(state, target.as_str(), target.start());
                state.add(
                    InlineToken::wrapped("a", whole.start(), whole.end(), self.name(), target.as_str())
                        .with_attribute("href", href),
                );
                matched = true;
            }
        }
        matched
    }
}

/// `[text][label]`; an empty label reuses the text.
pub struct ReferenceLink;

impl InlineRule for ReferenceLink {
    fn name(&self) -> &'static str {
        "reference_link"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let mut matched = false;
        for captures in state.match_spans(&REFERENCE_LINK, &[1], &[2]) {
            let (Some(whole), Some(text), Some(label)) =
                (captures.get(0), captures.get(1), captures.get(2))
            else {
                continue;
            };
            let label = if label.as_str().trim().is_empty() {
                unescape(text.as_str())
            } else {
                unescape(label.as_str())
            };
            let block = state.block();
            let pending = PendingLink {
                open: TokenRef::Inline {
                    block,
                    start: whole.start(),
                },
                close: TokenRef::Inline {
                    block,
                    start: text.end(),
                },
                point: state.point_at(whole.start()),
            };
            if !state.add(InlineToken::open("a", whole.start(), text.start(), self.name())) {
                continue;
            }
            state.add_over(InlineToken::close("a", text.end(), whole.end(), self.name()));
            state.document.resolve_reference(&label, pending);
            matched = true;
        }
        matched
    }
}

/// `[label]: url "title"` spanning the whole content; consumed silently.
pub struct ReferenceDefinition;

impl InlineRule for ReferenceDefinition {
    fn name(&self) -> &'static str {
        "reference_definition"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let Some(captures) = state.match_spans(&REFERENCE_DEF, &[], &[2, 3]).into_iter().next() else {
            return false;
        };
        let (Some(whole), Some(label), Some(url)) = (captures.get(0), captures.get(1), captures.get(2))
        else {
            return false;
        };
        let href = link_target(state, &unescape(url.as_str()), url.start());
        let title = captures.get(3).map(|title| unescape(title.as_str()));
        state.consume_over(whole.start(), whole.end());
        state
            .document
            .register_reference(label.as_str(), &href, title.as_deref());
        true
    }
}

/// Bare `http(s)://` and `www.` URLs and e-mail addresses.
pub struct AutoLink;

impl InlineRule for AutoLink {
    fn name(&self) -> &'static str {
        "autolink"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let mut matched = false;
        for found in state.match_all(&AUTOLINK).iter().filter_map(|captures| captures.get(0)) {
            let raw = found.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'', '"']);
            if raw.is_empty() || inside_link(state, found.start()) {
                continue;
            }
            let (start, end) = (found.start(), found.start() + raw.len());
            let href = link_target(state, raw, start);
            state.add(InlineToken::wrapped("a", start, end, self.name(), raw).with_attribute("href", href));
            matched = true;
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::{AutoLink, BracketLink, Link};
    use crate::inline::testing::{inline, inline_in, only};
    use crate::document::{DocumentState, Patch};
    use pretty_assertions::assert_eq;

    #[test]
    fn inline_link_keeps_text_parseable() {
        assert_eq!(
            inline(r#"see [the *docs*](https://x.dev "Docs") now"#),
            vec![
                "text:text:see @0..4",
                "open:a@4..5",
                "text:text:the @5..9",
                "open:em@9..10",
                "text:text:docs@10..14",
                "close:em@14..15",
                "close:a@15..38",
                "text:text: now@38..42",
            ]
        );
    }

    #[test]
    fn link_text_may_hold_code_escapes_and_math() {
        assert_eq!(
            inline("[`parse`](https://x.dev)"),
            vec!["open:a@0..1", "wrap:code:parse@1..8", "close:a@8..24"]
        );
        assert_eq!(
            inline(r"[a\_b](https://x.dev)"),
            vec![
                "open:a@0..1",
                "text:text:a@1..2",
                "text:text:_@2..4",
                "text:text:b@4..5",
                "close:a@5..21",
            ]
        );
        assert_eq!(
            inline("[$x$](https://x.dev)"),
            vec![
                "open:a@0..1",
                "open:span@1..2",
                "raw:text:x@2..3",
                "close:span@3..4",
                "close:a@4..20",
            ]
        );
    }

    #[test]
    fn escapes_inside_url_are_unescaped() {
        let mut document = DocumentState::new();
        let options = crate::parser::ParseOptions::default().without_math();
        let tokens = crate::inline::parse_inline(
            r"[ab](https://x.dev/a\_b)",
            0,
            crate::cursor::Point::default(),
            &mut document,
            &options,
        );
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].attributes.get("href"), Some("https://x.dev/a_b"));
        assert_eq!(tokens[2].position_end, 24);
    }

    #[test]
    fn code_span_over_delimiters_blocks_link() {
        let shapes = inline("`[a](b)` c");
        assert!(shapes.iter().all(|shape| !shape.contains(":a@")), "{shapes:?}");
    }

    #[test]
    fn reference_link_text_may_hold_code() {
        let mut document = DocumentState::new();
        document.register_reference("r", "http://x", None);
        let shapes = inline_in("[`c`][r]", &mut document);
        assert_eq!(shapes, vec!["open:a@0..1", "wrap:code:c@1..4", "close:a@4..8"]);
        assert_eq!(document.take_patches().len(), 1);
    }

    #[test]
    fn reference_definition_unescapes_url() {
        let mut document = DocumentState::new();
        let shapes = inline_in(r"[r]: http://x/a\_b", &mut document);
        assert!(shapes.is_empty(), "{shapes:?}");
        let reference = document.reference("r").cloned();
        assert_eq!(reference.map(|r| r.url), Some("http://x/a_b".to_string()));
    }

    #[test]
    fn link_attributes() {
        let mut document = DocumentState::new();
        let options = crate::parser::ParseOptions::default().without_math();
        let tokens = crate::inline::parse_inline(
            r#"[a](#intro "Intro")"#,
            0,
            crate::cursor::Point::default(),
            &mut document,
            &options,
        );
        assert_eq!(tokens[0].attributes.get("href"), Some("#intro"));
        assert_eq!(tokens[0].attributes.get("title"), Some("Intro"));
    }

    #[test]
    fn bracket_links() {
        assert_eq!(
            only(&BracketLink, "<<me@mail.org>> or <https://x.org/a>"),
            vec![
                "wrap:a:me@mail.org@0..15",
                "text:text: or @15..19",
                "wrap:a:https://x.org/a@19..36",
            ]
        );
    }

    #[test]
    fn autolink_trims_trailing_punctuation() {
        assert_eq!(
            only(&AutoLink, "visit www.rust-lang.org."),
            vec!["text:text:visit @0..6", "wrap:a:www.rust-lang.org@6..23", "text:text:.@23..24"]
        );
    }

    #[test]
    fn autolink_skips_link_text() {
        let shapes = inline("[http://a.io](http://a.io)");
        assert_eq!(shapes.iter().filter(|shape| shape.starts_with("wrap:a")).count(), 0);
    }

    #[test]
    fn invalid_url_warns_and_keeps_raw() {
        let mut document = DocumentState::new();
        let options = crate::parser::ParseOptions::default().without_math();
        let tokens = crate::inline::parse_inline(
            "[x](a\u{1}b)",
            0,
            crate::cursor::Point::new(3, 1, 20),
            &mut document,
            &options,
        );
        assert_eq!(tokens[0].attributes.get("href"), Some("a\u{1}b"));
        assert_eq!(document.diagnostics()[0].code, "W_URL_INVALID");
        assert_eq!(document.diagnostics()[0].point.line, 3);

        assert_eq!(only(&Link, "[x]()").len(), 3);
    }

    #[test]
    fn reference_definition_consumes_line() {
        let mut document = DocumentState::new();
        let shapes = inline_in(r#"[Lbl]: http://x "t""#, &mut document);
        assert!(shapes.is_empty());
        let reference = document.reference("lbl").cloned();
        assert_eq!(reference.map(|r| (r.url, r.title)), Some(("http://x".to_string(), Some("t".to_string()))));
    }

    #[test]
    fn reference_link_resolves_later_definition() {
        let mut document = DocumentState::new();
        let shapes = inline_in("[text][lbl]", &mut document);
        assert_eq!(
            shapes,
            vec!["open:a@0..1", "text:text:text@1..5", "close:a@5..11"]
        );
        assert!(document.take_patches().is_empty());
        inline_in(r#"[lbl]: http://x "t""#, &mut document);
        let patches = document.take_patches();
        assert!(patches.iter().any(|patch| matches!(
            patch,
            Patch::Attribute { key: "href", value, .. } if value == "http://x"
        )));
    }

    #[test]
    fn collapsed_reference_uses_text_as_label() {
        let mut document = DocumentState::new();
        document.register_reference("Rust", "https://rust-lang.org", None);
        inline_in("[Rust][]", &mut document);
        assert_eq!(document.take_patches().len(), 1);
    }
}
