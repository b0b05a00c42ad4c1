use std::ops::{Deref, DerefMut};

use crate::cursor::Point;

/// How a token maps onto HTML.
///
/// `Wrapped` stands for `<tag>content</tag>` as a single token so single-line
/// elements need no explicit open/text/close triple.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing,
    Wrapped,
    Text,
    /// Already-rendered HTML that is neither inline-parsed nor escaped.
    PreservedText,
}

/// Insertion-ordered attribute list; setting an existing key replaces its value in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Fields shared by block and inline tokens.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    /// HTML element name, or `"text"` for literal runs.
    pub tag: String,
    pub content: Option<String>,
    pub kind: TagKind,
    pub depth: usize,
    pub attributes: Attributes,
    /// Free-form marker for later passes; never rendered.
    pub annotation: Option<String>,
    /// Whether the inline pass re-scans `content`.
    pub parse_content: bool,
    /// Name of the rule that emitted the token.
    pub created_by: &'static str,
}

impl Token {
    fn new(
        tag: &str,
        kind: TagKind,
        created_by: &'static str,
        content: Option<String>,
        parse_content: bool,
        depth: usize,
    ) -> Self {
        Self {
            tag: tag.to_string(),
            content,
            kind,
            depth,
            attributes: Attributes::default(),
            annotation: None,
            parse_content,
            created_by,
        }
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockToken {
    pub token: Token,
    pub related_position: Point,
    /// Filled by the inline pass; empty before it runs.
    pub inline_tokens: Vec<InlineToken>,
}

impl Deref for BlockToken {
    type Target = Token;

    fn deref(&self) -> &Token {
        &self.token
    }
}

impl DerefMut for BlockToken {
    fn deref_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

impl BlockToken {
    fn new(token: Token, related_position: Point) -> Self {
        Self {
            token,
            related_position,
            inline_tokens: Vec::new(),
        }
    }

    pub fn open(tag: &str, at: Point, created_by: &'static str, depth: usize) -> Self {
        let token = Token::new(tag, TagKind::Open, created_by, None, false, depth);
        Self::new(token, at)
    }

    pub fn close(tag: &str, at: Point, created_by: &'static str, depth: usize) -> Self {
        let token = Token::new(tag, TagKind::Close, created_by, None, false, depth);
        Self::new(token, at)
    }

    pub fn self_closing(tag: &str, at: Point, created_by: &'static str, depth: usize) -> Self {
        let token = Token::new(tag, TagKind::SelfClosing, created_by, None, false, depth);
        Self::new(token, at)
    }

    pub fn wrapped(
        tag: &str,
        at: Point,
        created_by: &'static str,
        content: impl Into<String>,
        depth: usize,
    ) -> Self {
        let token = Token::new(
            tag,
            TagKind::Wrapped,
            created_by,
            Some(content.into()),
            true,
            depth,
        );
        Self::new(token, at)
    }

    pub fn text(
        at: Point,
        created_by: &'static str,
        content: impl Into<String>,
        depth: usize,
    ) -> Self {
        let token = Token::new(
            "text",
            TagKind::Text,
            created_by,
            Some(content.into()),
            true,
            depth,
        );
        Self::new(token, at)
    }

    pub fn preserved_text(
        at: Point,
        created_by: &'static str,
        content: impl Into<String>,
        depth: usize,
    ) -> Self {
        let token = Token::new(
            "text",
            TagKind::PreservedText,
            created_by,
            Some(content.into()),
            false,
            depth,
        );
        Self::new(token, at)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.token.attributes.set(key, value);
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.token.annotation = Some(annotation.into());
        self
    }

    /// Keeps the content out of the inline pass; it is still escaped on output.
    pub fn verbatim(mut self) -> Self {
        self.token.parse_content = false;
        self
    }
}

/// A span-level token. `position_start..position_end` is the half-open byte
/// range of the owning block token's content that this token consumes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InlineToken {
    pub token: Token,
    pub position_start: usize,
    pub position_end: usize,
}

impl Deref for InlineToken {
    type Target = Token;

    fn deref(&self) -> &Token {
        &self.token
    }
}

impl DerefMut for InlineToken {
    fn deref_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

impl InlineToken {
    fn new(token: Token, start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inline range {start}..{end} is inverted");
        Self {
            token,
            position_start: start,
            position_end: end,
        }
    }

    pub fn open(tag: &str, start: usize, end: usize, created_by: &'static str) -> Self {
        let token = Token::new(tag, TagKind::Open, created_by, None, false, 0);
        Self::new(token, start, end)
    }

    pub fn close(tag: &str, start: usize, end: usize, created_by: &'static str) -> Self {
        let token = Token::new(tag, TagKind::Close, created_by, None, false, 0);
        Self::new(token, start, end)
    }

    pub fn self_closing(tag: &str, start: usize, end: usize, created_by: &'static str) -> Self {
        let token = Token::new(tag, TagKind::SelfClosing, created_by, None, false, 0);
        Self::new(token, start, end)
    }

    pub fn wrapped(
        tag: &str,
        start: usize,
        end: usize,
        created_by: &'static str,
        content: impl Into<String>,
    ) -> Self {
        let token = Token::new(
            tag,
            TagKind::Wrapped,
            created_by,
            Some(content.into()),
            false,
            0,
        );
        Self::new(token, start, end)
    }

    pub fn text(start: usize, end: usize, created_by: &'static str, content: impl Into<String>) -> Self {
        let token = Token::new(
            "text",
            TagKind::Text,
            created_by,
            Some(content.into()),
            true,
            0,
        );
        Self::new(token, start, end)
    }

    pub fn preserved_text(
        start: usize,
        end: usize,
        created_by: &'static str,
        content: impl Into<String>,
    ) -> Self {
        let token = Token::new(
            "text",
            TagKind::PreservedText,
            created_by,
            Some(content.into()),
            false,
            0,
        );
        Self::new(token, start, end)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.token.attributes.set(key, value);
        self
    }
}
