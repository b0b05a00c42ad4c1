//! Span-level rules run over the content of one block token at a time.
//!
//! Rules claim half-open byte ranges of the content. A claimed byte is never
//! matched again by a later rule; [`InlineState::match_all`] enforces that for
//! every rule. Bytes nobody claimed are coalesced into literal text runs.

mod code;
mod emphasis;
mod escape;
mod footnote_ref;
mod link;
mod math;

pub use code::CodeSpan;
pub use emphasis::Emphasis;
pub use escape::Escape;
pub use footnote_ref::FootnoteRef;
pub use link::{AutoLink, BracketLink, Link, ReferenceDefinition, ReferenceLink};
pub use math::InlineMath;

use std::collections::BTreeMap;

use regex::{Captures, Regex};

use crate::cursor::Point;
use crate::diagnostic::Diagnostic;
use crate::document::DocumentState;
use crate::parser::ParseOptions;
use crate::token::{InlineToken, TagKind};

pub trait InlineRule {
    fn name(&self) -> &'static str;

    /// Returns true when at least one span was claimed.
    fn process(&self, state: &mut InlineState<'_>) -> bool;
}

/// Priority order: escapes mask delimiters first, code spans protect their
/// interior from everything after them.
pub const INLINE_RULES: &[&dyn InlineRule] = &[
    &Escape,
    &CodeSpan,
    &InlineMath,
    &ReferenceDefinition,
    &Link,
    &BracketLink,
    &FootnoteRef,
    &ReferenceLink,
    &AutoLink,
    &Emphasis,
];

pub struct InlineState<'a> {
    text: &'a str,
    block: usize,
    point: Point,
    claimed: Vec<bool>,
    escaped: Vec<bool>,
    tokens: BTreeMap<usize, InlineToken>,
    pub document: &'a mut DocumentState,
    pub options: &'a ParseOptions<'a>,
}

impl<'a> InlineState<'a> {
    pub fn new(
        text: &'a str,
        block: usize,
        point: Point,
        document: &'a mut DocumentState,
        options: &'a ParseOptions<'a>,
    ) -> Self {
        Self {
            text,
            block,
            point,
            claimed: vec![false; text.len()],
            escaped: vec![false; text.len()],
            tokens: BTreeMap::new(),
            document,
            options,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Index of the owning block token in the final token list.
    pub fn block(&self) -> usize {
        self.block
    }

    /// Source position of the byte at `pos`, assuming single-line content.
    pub fn point_at(&self, pos: usize) -> Point {
        Point::new(
            self.point.line,
            self.point.column + pos,
            self.point.offset + pos,
        )
    }

    pub fn is_claimed(&self, pos: usize) -> bool {
        self.claimed.get(pos).copied().unwrap_or(false)
    }

    pub fn is_free(&self, start: usize, end: usize) -> bool {
        (start..end).all(|pos| !self.is_claimed(pos))
    }

    pub fn escape(&mut self, pos: usize) {
        if let Some(escaped) = self.escaped.get_mut(pos) {
            *escaped = true;
        }
    }

    pub fn is_escaped(&self, pos: usize) -> bool {
        self.escaped.get(pos).copied().unwrap_or(false)
    }

    /// Regex matches whose whole range is still unclaimed.
    pub fn match_all(&self, regex: &Regex) -> Vec<Captures<'a>> {
        self.match_spans(regex, &[], &[])
    }

    /// Regex matches whose delimiters are still unclaimed. Capture groups in
    /// `nested` may already hold tokens other than links; groups in
    /// `escapable` may hold escape pairs but nothing else.
    pub fn match_spans(
        &self,
        regex: &Regex,
        nested: &[usize],
        escapable: &[usize],
    ) -> Vec<Captures<'a>> {
        let text = self.text;
        regex
            .captures_iter(text)
            .filter(|captures| self.delimiters_free(captures, nested, escapable))
            .collect()
    }

    fn delimiters_free(&self, captures: &Captures<'_>, nested: &[usize], escapable: &[usize]) -> bool {
        let Some(whole) = captures.get(0) else {
            return false;
        };
        let group_of = |pos: usize, groups: &[usize]| {
            groups.iter().filter_map(|&group| captures.get(group)).find(|found| found.range().contains(&pos))
        };
        for inner in nested.iter().filter_map(|&group| captures.get(group)) {
            if self.tokens.range(inner.range()).any(|(_, token)| token.tag == "a") {
                return false;
            }
        }
        (whole.start()..whole.end()).all(|pos| {
            if !self.is_claimed(pos) || group_of(pos, nested).is_some() {
                return true;
            }
            group_of(pos, escapable).is_some_and(|group| {
                let range = group.range();
                (self.is_escaped(pos) && range.contains(&(pos - 1)))
                    || (self.is_escaped(pos + 1) && range.contains(&(pos + 1)))
            })
        })
    }

    /// Claims `start..end` without producing output.
    pub fn consume(&mut self, start: usize, end: usize) {
        let end = end.min(self.claimed.len());
        for claimed in &mut self.claimed[start.min(end)..end] {
            *claimed = true;
        }
    }

    /// Claims `start..end` without producing output, dropping tokens inside it.
    pub fn consume_over(&mut self, start: usize, end: usize) {
        let inside: Vec<usize> = self
            .tokens
            .range(start..end)
            .filter(|(_, existing)| existing.position_end <= end)
            .map(|(pos, _)| *pos)
            .collect();
        for pos in inside {
            self.tokens.remove(&pos);
        }
        self.consume(start, end);
    }

    /// Claims the token's range and records it. A range overlapping an earlier
    /// claim is refused.
    pub fn add(&mut self, token: InlineToken) -> bool {
        let (start, end) = (token.position_start, token.position_end);
        if start >= end || end > self.text.len() || !self.is_free(start, end) {
            return false;
        }
        self.consume(start, end);
        self.tokens.insert(start, token);
        true
    }

    /// Claims the token's range, dropping tokens already inside it.
    pub fn add_over(&mut self, token: InlineToken) {
        self.consume_over(token.position_start, token.position_end);
        self.tokens.insert(token.position_start, token);
    }

    /// Innermost `open` token before `pos` whose `close` has not been seen yet.
    pub fn enclosing(&self, pos: usize) -> Option<&InlineToken> {
        let mut open: Vec<&InlineToken> = Vec::new();
        for token in self.tokens.range(..pos).map(|(_, token)| token) {
            match token.kind {
                TagKind::Open => open.push(token),
                TagKind::Close => {
                    if let Some(index) = open.iter().rposition(|opened| opened.tag == token.tag) {
                        open.truncate(index);
                    }
                }
                _ => {}
            }
        }
        open.pop()
    }

    pub fn warn(&mut self, pos: usize, code: &'static str, message: impl Into<String>) {
        let diagnostic = Diagnostic::warning(self.point_at(pos), code, message);
        self.document.push_diagnostic(diagnostic);
    }

    /// Interleaves the claimed tokens with literal runs of unclaimed bytes.
    pub fn into_tokens(self) -> Vec<InlineToken> {
        let mut out = Vec::with_capacity(self.tokens.len() * 2 + 1);
        let mut pos = 0;
        for (start, token) in self.tokens {
            if start > pos {
                push_text_run(&mut out, self.text, &self.claimed, pos, start);
            }
            pos = pos.max(token.position_end);
            out.push(token);
        }
        if pos < self.text.len() {
            push_text_run(&mut out, self.text, &self.claimed, pos, self.text.len());
        }
        out
    }
}

fn push_text_run(out: &mut Vec<InlineToken>, text: &str, claimed: &[bool], start: usize, end: usize) {
    let mut content = String::new();
    let mut run_start = None;
    for pos in start..=end {
        let free = pos < end && !claimed[pos];
        match (free, run_start) {
            (true, None) => run_start = Some(pos),
            (false, Some(from)) => {
                content.push_str(&text[from..pos]);
                run_start = None;
            }
            _ => {}
        }
    }
    if !content.is_empty() {
        out.push(InlineToken::text(start, end, "parser", content));
    }
}

/// Runs every rule over `text` and returns the ordered inline tokens.
pub fn parse_inline(
    text: &str,
    block: usize,
    point: Point,
    document: &mut DocumentState,
    options: &ParseOptions<'_>,
) -> Vec<InlineToken> {
    let mut state = InlineState::new(text, block, point, document, options);
    for rule in INLINE_RULES {
        if rule.process(&mut state) {
            log::trace!("inline rule {} matched in block {}", rule.name(), block);
        }
    }
    state.into_tokens()
}


#[cfg(test)]
mod tests {
    use super::InlineState;
    use super::testing::{inline, shape};
    use crate::cursor::Point;
    use crate::document::DocumentState;
    use crate::parser::ParseOptions;
    use crate::token::InlineToken;
    use regex::Regex;

    #[test]
    fn plain_text_is_one_run() {
        assert_eq!(inline("just words"), vec!["text:text:just words@0..10"]);
    }

    #[test]
    fn match_all_skips_claimed_ranges() {
        let mut document = DocumentState::new();
        let options = ParseOptions::default();
        let mut state = InlineState::new("ab ab ab", 0, Point::default(), &mut document, &options);
        assert!(state.add(InlineToken::wrapped("b", 3, 5, "test", "ab")));
        let regex = Regex::new("ab").unwrap();
        let starts: Vec<usize> = state
            .match_all(&regex)
            .iter()
            .filter_map(|captures| captures.get(0))
            .map(|whole| whole.start())
            .collect();
        assert_eq!(starts, vec![0, 6]);
        assert!(!state.add(InlineToken::wrapped("i", 4, 7, "test", "x")));
    }

    #[test]
    fn consumed_bytes_vanish_from_text_runs() {
        let mut document = DocumentState::new();
        let options = ParseOptions::default();
        let mut state = InlineState::new("a[x]b", 0, Point::default(), &mut document, &options);
        state.consume(1, 4);
        assert_eq!(shape(&state.into_tokens()), vec!["text:text:ab@0..5"]);
    }

    #[test]
    fn enclosing_finds_innermost_open() {
        let mut document = DocumentState::new();
        let options = ParseOptions::default();
        let mut state = InlineState::new("[a] b", 0, Point::default(), &mut document, &options);
        state.add(InlineToken::open("a", 0, 1, "test"));
        state.add(InlineToken::close("a", 2, 3, "test"));
        assert_eq!(state.enclosing(1).map(|token| token.position_start), Some(0));
        assert!(state.enclosing(4).is_none());
    }
}
