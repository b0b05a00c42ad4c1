use super::{
    BlockContext, BlockMath, BlockRule, CodeBlock, FootnoteDef, Heading, List, probe_terminators,
};
use crate::cursor::InputCursor;
use crate::state_change::StateChange;
use crate::token::BlockToken;

const HARD_BREAK_SPACES: usize = 2;

/// Catch-all: consecutive non-blank lines become one `p`.
pub struct Paragraph;

impl BlockRule for Paragraph {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn terminated_by(&self) -> &'static [&'static dyn BlockRule] {
        &[&Heading, &List, &CodeBlock, &FootnoteDef, &BlockMath]
    }

    fn process(
        &self,
        ctx: &BlockContext<'_>,
        cursor: &mut InputCursor,
        change: &mut StateChange,
    ) -> bool {
        if cursor.skip_to_first_non_empty_line().is_none() {
            return false;
        }
        let name = self.name();
        let open = change.add_token(BlockToken::open("p", cursor.current_point(), name, 0));
        let mut has_text = false;

        while !cursor.is_at_eof() && !cursor.is_empty_line(0) {
            if has_text && let Some(probe) = probe_terminators(ctx, cursor, self) {
                change.add_token(BlockToken::close("p", probe.start(), name, 0));
                change.merge(probe);
                return true;
            }

            let (point, line) = cursor.line_skip_whitespace(0);
            let text = line.trim_end().to_string();
            change.add_token(BlockToken::text(point, name, text, 1));
            has_text = true;
            if cursor.trailing_whitespaces(0) >= HARD_BREAK_SPACES {
                change.add_token(BlockToken::self_closing("br", point, name, 1));
            }
            cursor.next_line();
        }

        if has_text {
            change.add_token(BlockToken::close("p", cursor.current_point(), name, 0));
        } else {
            change.tokens.truncate(open);
        }
        true
    }
}
