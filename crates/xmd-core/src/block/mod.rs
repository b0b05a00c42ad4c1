//! Line-oriented block rules.
//!
//! Every rule inspects the cursor at a non-blank line and either declines
//! without consuming anything or consumes one or more lines and records its
//! tokens in a [`StateChange`]. On success the cursor is left on the first
//! line the rule did not consume.

mod codeblock;
mod footnote_def;
mod heading;
mod list;
mod math;
mod paragraph;
mod table;

pub use codeblock::CodeBlock;
pub use footnote_def::FootnoteDef;
pub use heading::Heading;
pub use list::List;
pub use math::BlockMath;
pub use paragraph::Paragraph;
pub use table::Table;

use crate::cursor::InputCursor;
use crate::document::DocumentState;
use crate::parser::ParseOptions;
use crate::state_change::StateChange;

/// Read-only view handed to block rules.
pub struct BlockContext<'a> {
    pub document: &'a DocumentState,
    pub options: &'a ParseOptions<'a>,
}

pub trait BlockRule {
    fn name(&self) -> &'static str;

    fn process(
        &self,
        ctx: &BlockContext<'_>,
        cursor: &mut InputCursor,
        change: &mut StateChange,
    ) -> bool;

    /// Rules that may end this one at a line it would otherwise consume.
    fn terminated_by(&self) -> &'static [&'static dyn BlockRule] {
        &[]
    }
}

/// Driver order; the paragraph is the catch-all and stays last.
pub const BLOCK_RULES: &[&dyn BlockRule] = &[
    &CodeBlock,
    &BlockMath,
    &FootnoteDef,
    &Heading,
    &Table,
    &List,
    &Paragraph,
];

/// Offers the current line to every rule that terminates `interrupted`.
///
/// The first rule that accepts wins and its change is returned with its end
/// point set. When none accepts, the cursor is back where it started.
pub fn probe_terminators(
    ctx: &BlockContext<'_>,
    cursor: &mut InputCursor,
    interrupted: &dyn BlockRule,
) -> Option<StateChange> {
    let start = cursor.current_point();
    for rule in interrupted.terminated_by() {
        let mut probe = StateChange::new(start, rule.name());
        probe.interrupting = Some(interrupted.name());
        if rule.process(ctx, cursor, &mut probe) {
            probe.set_end(cursor.current_point());
            log::trace!(
                "{} interrupts {} at line {}",
                rule.name(),
                interrupted.name(),
                start.line
            );
            return Some(probe);
        }
        cursor.reset_to(start);
    }
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{BlockContext, BlockRule};
    use crate::cursor::InputCursor;
    use crate::document::DocumentState;
    use crate::parser::ParseOptions;
    use crate::state_change::StateChange;
    use crate::token::{BlockToken, TagKind};

    /// Runs `rule` on the first line of `input` with default collaborators
    /// minus math rendering.
    pub fn run(rule: &dyn BlockRule, input: &str) -> (bool, StateChange, InputCursor) {
        let document = DocumentState::new();
        let options = ParseOptions::default().without_math();
        run_with(rule, input, &document, &options)
    }

    pub fn run_with(
        rule: &dyn BlockRule,
        input: &str,
        document: &DocumentState,
        options: &ParseOptions<'_>,
    ) -> (bool, StateChange, InputCursor) {
        let mut cursor = InputCursor::new(input);
        let ctx = BlockContext { document, options };
        let mut change = StateChange::new(cursor.current_point(), rule.name());
        let accepted = rule.process(&ctx, &mut cursor, &mut change);
        (accepted, change, cursor)
    }

    /// Compact `kind:tag[:content]@depth` rendering for assertions.
    pub fn shape(tokens: &[BlockToken]) -> Vec<String> {
        tokens
            .iter()
            .map(|token| {
                let kind = match token.kind {
                    TagKind::Open => "open",
                    TagKind::Close => "close",
                    TagKind::SelfClosing => "void",
                    TagKind::Wrapped => "wrap",
                    TagKind::Text => "text",
                    TagKind::PreservedText => "raw",
                };
                match &token.content {
                    Some(content) => format!("{kind}:{}:{content}@{}", token.tag, token.depth),
                    None => format!("{kind}:{}@{}", token.tag, token.depth),
                }
            })
            .collect()
    }
}
