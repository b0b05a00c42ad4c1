use std::ops::Range;

use crate::backend::{Highlighter, MathRenderer, StandardUrls, UrlNormalizer};
use crate::block::{BLOCK_RULES, BlockContext};
use crate::cursor::InputCursor;
use crate::diagnostic::Diagnostic;
use crate::document::{DocumentState, HeadingEntry, OnNumber, Patch, Reference, TokenRef};
use crate::inline::parse_inline;
use crate::math::TypstMath;
use crate::state_change::StateChange;
use crate::token::{BlockToken, InlineToken, TagKind, Token};

/// Collaborators used while parsing.
#[derive(Clone, Copy)]
pub struct ParseOptions<'a> {
    pub highlighter: Option<&'a dyn Highlighter>,
    pub math: Option<&'a dyn MathRenderer>,
    pub urls: &'a dyn UrlNormalizer,
}

impl Default for ParseOptions<'_> {
    fn default() -> Self {
        Self {
            highlighter: None,
            math: Some(&TypstMath),
            urls: &StandardUrls,
        }
    }
}

impl<'a> ParseOptions<'a> {
    pub fn with_highlighter(mut self, highlighter: &'a dyn Highlighter) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    pub fn with_math(mut self, math: &'a dyn MathRenderer) -> Self {
        self.math = Some(math);
        self
    }

    /// Emits math source as escaped text instead of rendering it.
    pub fn without_math(mut self) -> Self {
        self.math = None;
        self
    }

    pub fn with_urls(mut self, urls: &'a dyn UrlNormalizer) -> Self {
        self.urls = urls;
        self
    }
}

/// Source lines behind one committed block rule result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedBlock {
    /// `markdown-block-<start>-<end>` with 0-based, inclusive line numbers.
    pub id: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Range into [`ParsedState::tokens`].
    pub tokens: Range<usize>,
    pub created_by: String,
    pub text: String,
}

impl ParsedBlock {
    fn new(start_line: usize, end_line: usize, tokens: Range<usize>, created_by: &str, text: String) -> Self {
        Self {
            id: format!("markdown-block-{start_line}-{end_line}"),
            start_line,
            end_line,
            tokens,
            created_by: created_by.to_string(),
            text,
        }
    }
}

#[derive(Debug)]
pub struct ParsedState {
    pub tokens: Vec<BlockToken>,
    pub blocks: Vec<ParsedBlock>,
    pub headings: Vec<HeadingEntry>,
    pub references: Vec<Reference>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn parse(source: &str) -> ParsedState {
    parse_with_options(source, &ParseOptions::default())
}

pub fn parse_with_options(source: &str, options: &ParseOptions<'_>) -> ParsedState {
    let cursor = InputCursor::new(source);
    if cursor.is_empty() {
        return ParsedState {
            tokens: Vec::new(),
            blocks: vec![ParsedBlock::new(0, 0, 0..0, "empty", String::new())],
            headings: Vec::new(),
            references: Vec::new(),
            diagnostics: Vec::new(),
        };
    }

    let mut parser = Parser {
        cursor,
        document: DocumentState::new(),
        options,
        store: TokenStore::default(),
        blocks: Vec::new(),
    };
    parser.parse_blocks();
    parser.append_footer();
    parser.parse_inlines();
    parser.finish()
}

/// Body and footer tokens; patches address both until the footer is appended.
#[derive(Default)]
struct TokenStore {
    body: Vec<BlockToken>,
    footer: Vec<BlockToken>,
    footer_offset: Option<usize>,
}

impl TokenStore {
    fn block_mut(&mut self, target: TokenRef) -> Option<&mut BlockToken> {
        match target {
            TokenRef::Body(index) | TokenRef::Inline { block: index, .. } => self.body.get_mut(index),
            TokenRef::Footer(index) => match self.footer_offset {
                Some(offset) => self.body.get_mut(offset + index),
                None => self.footer.get_mut(index),
            },
        }
    }

    fn inline_mut(&mut self, block: usize, start: usize) -> Option<&mut InlineToken> {
        self.body
            .get_mut(block)?
            .inline_tokens
            .iter_mut()
            .find(|token| token.position_start == start && token.kind != TagKind::Text)
    }

    fn token_mut(&mut self, target: TokenRef) -> Option<&mut Token> {
        match target {
            TokenRef::Inline { block, start } => self.inline_mut(block, start).map(|token| &mut token.token),
            _ => self.block_mut(target).map(|token| &mut token.token),
        }
    }

    fn apply(&mut self, patch: Patch) {
        match patch {
            Patch::Attribute { target, key, value } => match self.token_mut(target) {
                Some(token) => token.attributes.set(key, value),
                None => log::debug!("attribute patch for missing token {target:?}"),
            },
            Patch::Number { target, number, apply } => self.number(target, number, apply),
            Patch::Literal { target } => self.literal(target),
        }
    }

    fn number(&mut self, target: TokenRef, number: usize, apply: OnNumber) {
        if let TokenRef::Inline { block, start } = target {
            if let Some(token) = self.inline_mut(block, start) {
                apply(number, &mut token.token);
            }
            return;
        }
        let Some(block) = self.block_mut(target) else {
            log::debug!("number patch for missing token {target:?}");
            return;
        };
        let before = block.content().len();
        apply(number, &mut block.token);
        let added = block.content().len().saturating_sub(before);
        if added == 0 || block.inline_tokens.is_empty() {
            return;
        }
        // Already inline-parsed: keep positions valid for the new prefix.
        for inline in &mut block.inline_tokens {
            inline.position_start += added;
            inline.position_end += added;
        }
        let prefix = block.content()[..added].to_string();
        block
            .inline_tokens
            .insert(0, InlineToken::text(0, added, "parser", prefix));
    }

    fn literal(&mut self, target: TokenRef) {
        let TokenRef::Inline { block, start } = target else {
            return;
        };
        let source = match self.body.get(block) {
            Some(token) => token.content().to_string(),
            None => return,
        };
        if let Some(inline) = self.inline_mut(block, start) {
            let text = source
                .get(inline.position_start..inline.position_end)
                .unwrap_or_default()
                .to_string();
            inline.token.tag = "text".to_string();
            inline.token.kind = TagKind::Text;
            inline.token.content = Some(text);
            inline.token.attributes.clear();
        }
    }
}

struct Parser<'a> {
    cursor: InputCursor,
    document: DocumentState,
    options: &'a ParseOptions<'a>,
    store: TokenStore,
    blocks: Vec<ParsedBlock>,
}

impl Parser<'_> {
    fn parse_blocks(&mut self) {
        while !self.cursor.is_at_eof() {
            if self.cursor.is_empty_line(0) {
                self.cursor.next_line();
                continue;
            }
            let start = self.cursor.current_point();
            let Some(change) = self.run_rules() else {
                panic!("no block rule accepted line {}", start.line);
            };
            assert!(
                self.cursor.current_point().line > start.line,
                "rule {} accepted line {} without consuming it",
                change.executed_by(),
                start.line
            );
            self.commit(change);
        }
    }

    fn run_rules(&mut self) -> Option<StateChange> {
        let start = self.cursor.current_point();
        let ctx = BlockContext {
            document: &self.document,
            options: self.options,
        };
        for rule in BLOCK_RULES {
            let mut change = StateChange::new(start, rule.name());
            if rule.process(&ctx, &mut self.cursor, &mut change) {
                change.set_end(self.cursor.current_point());
                return Some(change);
            }
            self.cursor.reset_to(start);
        }
        None
    }

    fn commit(&mut self, change: StateChange) {
        let start = change.start();
        let end = change.end();
        let created_by = change.executed_by().to_string();
        let token_base = self.store.body.len();
        let footer_base = self.store.footer.len();

        for heading in change.headings {
            self.document.register_heading(
                &heading.text,
                heading.level,
                heading.line,
                TokenRef::Body(token_base + heading.token),
            );
        }
        for footnote in change.footnotes {
            let destination = TokenRef::Footer(footer_base + footnote.token);
            if !self
                .document
                .register_footnote_def(&footnote.label, destination, footnote.on_number)
            {
                log::debug!("footnote `{}` registered twice in one block", footnote.label);
            }
        }
        for diagnostic in change.diagnostics {
            self.document.push_diagnostic(diagnostic);
        }
        self.store.body.extend(change.tokens);
        self.store.footer.extend(change.footer);
        self.apply_patches();

        let last = end
            .line
            .saturating_sub(1)
            .clamp(start.line, self.cursor.line_count().max(start.line));
        self.blocks.push(ParsedBlock::new(
            start.line - 1,
            last - 1,
            token_base..self.store.body.len(),
            &created_by,
            self.cursor.slice(start.line, last),
        ));
        log::trace!("committed {created_by} for lines {}..={last}", start.line);
    }

    fn apply_patches(&mut self) {
        for patch in self.document.take_patches() {
            self.store.apply(patch);
        }
    }

    fn append_footer(&mut self) {
        if self.store.footer.is_empty() {
            return;
        }
        let at = self.cursor.current_point();
        self.store
            .body
            .push(BlockToken::self_closing("hr", at, "parser", 0));
        self.store.footer_offset = Some(self.store.body.len());
        let footer = std::mem::take(&mut self.store.footer);
        self.store.body.extend(footer);
    }

    fn parse_inlines(&mut self) {
        for index in 0..self.store.body.len() {
            let token = &self.store.body[index];
            if !token.parse_content {
                continue;
            }
            let Some(content) = token.content.clone().filter(|content| !content.is_empty()) else {
                continue;
            };
            let point = token.related_position;
            let inline = parse_inline(&content, index, point, &mut self.document, self.options);
            self.store.body[index].inline_tokens = inline;
            self.apply_patches();
        }
    }

    fn finish(mut self) -> ParsedState {
        for patch in self.document.finish() {
            self.store.apply(patch);
        }
        self.prune_empty_paragraphs();

        let (headings, references, mut diagnostics) = self.document.into_parts();
        diagnostics.sort_by_key(|diagnostic| (diagnostic.point.line, diagnostic.point.column));
        ParsedState {
            tokens: self.store.body,
            blocks: self.blocks,
            headings,
            references,
            diagnostics,
        }
    }

    /// Drops paragraphs whose every line was consumed by reference definitions.
    fn prune_empty_paragraphs(&mut self) {
        let tokens = &self.store.body;
        let mut keep = vec![true; tokens.len()];
        let mut index = 0;
        while index < tokens.len() {
            let token = &tokens[index];
            if token.kind != TagKind::Open || token.tag != "p" || token.created_by != "paragraph" {
                index += 1;
                continue;
            }
            let Some(length) = tokens[index + 1..]
                .iter()
                .position(|token| token.kind == TagKind::Close && token.tag == "p")
            else {
                break;
            };
            let close = index + 1 + length;
            let inner = &tokens[index + 1..close];
            let consumed = |token: &BlockToken| {
                token.kind == TagKind::Text && token.inline_tokens.is_empty()
            };
            let hard_break = |token: &BlockToken| token.kind == TagKind::SelfClosing && token.tag == "br";
            if inner.iter().any(consumed)
                && inner.iter().all(|token| consumed(token) || hard_break(token))
            {
                keep[index..=close].fill(false);
            }
            index = close + 1;
        }
        if keep.iter().all(|kept| *kept) {
            return;
        }

        let mut remap = Vec::with_capacity(keep.len() + 1);
        let mut kept = 0;
        for keep in &keep {
            remap.push(kept);
            if *keep {
                kept += 1;
            }
        }
        remap.push(kept);
        for block in &mut self.blocks {
            block.tokens = remap[block.tokens.start]..remap[block.tokens.end];
        }
        let mut flags = keep.into_iter();
        self.store.body.retain(|_| flags.next().unwrap_or(true));
    }
}
