use crate::cursor::Point;
use crate::diagnostic::Diagnostic;
use crate::document::OnNumber;
use crate::label::normalize_label;
use crate::token::BlockToken;

pub(crate) struct PendingHeading {
    pub token: usize,
    pub text: String,
    pub level: u8,
    pub line: usize,
}

pub(crate) struct PendingFootnote {
    pub label: String,
    pub token: usize,
    pub on_number: OnNumber,
}

/// Effects proposed by one block rule invocation.
///
/// Nothing in here touches the document until the driver commits it, so a
/// rule can run speculatively and the result can simply be dropped. Token
/// indices recorded for registrations are local to this change and are
/// rebased on commit.
pub struct StateChange {
    start: Point,
    end: Point,
    executed_by: String,
    /// Set while the change probes whether a line ends the named rule.
    pub interrupting: Option<&'static str>,
    pub(crate) tokens: Vec<BlockToken>,
    pub(crate) footer: Vec<BlockToken>,
    pub(crate) headings: Vec<PendingHeading>,
    pub(crate) footnotes: Vec<PendingFootnote>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl StateChange {
    pub fn new(start: Point, executed_by: &str) -> Self {
        Self {
            start,
            end: start,
            executed_by: executed_by.to_string(),
            interrupting: None,
            tokens: Vec::new(),
            footer: Vec::new(),
            headings: Vec::new(),
            footnotes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn set_end(&mut self, end: Point) {
        self.end = end;
    }

    pub fn executed_by(&self) -> &str {
        &self.executed_by
    }

    pub fn tokens(&self) -> &[BlockToken] {
        &self.tokens
    }

    pub fn footer_tokens(&self) -> &[BlockToken] {
        &self.footer
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.footer.is_empty()
    }

    /// Appends a body token and returns its local index.
    pub fn add_token(&mut self, token: BlockToken) -> usize {
        self.tokens.push(token);
        self.tokens.len() - 1
    }

    pub fn add_footer_token(&mut self, token: BlockToken) -> usize {
        self.footer.push(token);
        self.footer.len() - 1
    }

    /// Queues a heading registration for the body token at `token`.
    pub fn register_heading(&mut self, token: usize, text: &str, level: u8, line: usize) {
        self.headings.push(PendingHeading {
            token,
            text: text.to_string(),
            level,
            line,
        });
    }

    /// Queues a footnote definition whose destination is the footer token at `token`.
    pub fn register_footnote_def(&mut self, label: &str, token: usize, on_number: OnNumber) {
        self.footnotes.push(PendingFootnote {
            label: label.to_string(),
            token,
            on_number,
        });
    }

    pub fn defines_footnote(&self, label: &str) -> bool {
        let key = normalize_label(label);
        self.footnotes
            .iter()
            .any(|footnote| normalize_label(&footnote.label) == key)
    }

    pub fn warn(&mut self, point: Point, code: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warning(point, code, message));
    }

    /// Appends the effects of `other`, which ran right after this change.
    pub fn merge(&mut self, other: StateChange) {
        let token_base = self.tokens.len();
        let footer_base = self.footer.len();
        self.tokens.extend(other.tokens);
        self.footer.extend(other.footer);
        self.headings
            .extend(other.headings.into_iter().map(|mut heading| {
                heading.token += token_base;
                heading
            }));
        self.footnotes
            .extend(other.footnotes.into_iter().map(|mut footnote| {
                footnote.token += footer_base;
                footnote
            }));
        self.diagnostics.extend(other.diagnostics);
        self.end = other.end;
        self.executed_by.push_str(", ");
        self.executed_by.push_str(&other.executed_by);
    }
}

#[cfg(test)]
mod tests {
    use super::StateChange;
    use crate::cursor::Point;
    use crate::token::{BlockToken, Token};

    #[test]
    fn merge_rebases_local_indices() {
        let at = Point::new(1, 1, 0);
        let mut first = StateChange::new(at, "paragraph");
        first.add_token(BlockToken::open("p", at, "paragraph", 0));
        first.add_token(BlockToken::close("p", at, "paragraph", 0));

        let next = Point::new(2, 1, 4);
        let mut second = StateChange::new(next, "heading");
        let index = second.add_token(BlockToken::wrapped("h2", next, "heading", "Title", 0));
        second.register_heading(index, "Title", 2, 2);
        let footer = second.add_footer_token(BlockToken::open("p", next, "footnote_def", 0));
        second.register_footnote_def("n", footer, Box::new(|_: usize, _: &mut Token| {}));
        second.set_end(Point::new(3, 1, 12));

        first.merge(second);
        assert_eq!(first.tokens().len(), 3);
        assert_eq!(first.headings[0].token, 2);
        assert_eq!(first.footnotes[0].token, 0);
        assert_eq!(first.end().line, 3);
        assert_eq!(first.executed_by(), "paragraph, heading");
        assert!(first.defines_footnote("N"));
    }
}
