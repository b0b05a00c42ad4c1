use super::{BlockContext, BlockRule};
use crate::cursor::InputCursor;
use crate::diagnostic::{W_MATH_RENDER, W_MATH_UNCLOSED};
use crate::state_change::StateChange;
use crate::token::BlockToken;

const DELIMITER: &str = "$$";

/// `$$ ... $$` on one line, or a lone `$$` opening a multi-line block.
pub struct BlockMath;

impl BlockRule for BlockMath {
    fn name(&self) -> &'static str {
        "block_math"
    }

    fn process(
        &self,
        ctx: &BlockContext<'_>,
        cursor: &mut InputCursor,
        change: &mut StateChange,
    ) -> bool {
        let (point, line) = cursor.line_skip_whitespace(0);
        let line = line.trim_end();
        let Some(rest) = line.strip_prefix(DELIMITER) else {
            return false;
        };

        let source = if rest.is_empty() {
            let mut lines = Vec::new();
            let mut closed = false;
            while let Some(line) = cursor.next_line() {
                let line = line.trim_end();
                if let Some(last) = line.strip_suffix(DELIMITER) {
                    lines.push(last.to_string());
                    closed = true;
                    break;
                }
                lines.push(line.to_string());
            }
            if !closed {
                change.warn(point, W_MATH_UNCLOSED, "math block is never closed");
            }
            lines.join("\n")
        } else {
            rest.strip_suffix(DELIMITER).unwrap_or(rest).to_string()
        };
        if !cursor.is_at_eof() {
            cursor.next_line();
        }

        let source = source.trim();
        let name = self.name();
        let (class, html) = match ctx.options.math.map(|math| math.render(source, true)) {
            Some(Ok(html)) => ("math-block", html),
            Some(Err(err)) => {
                change.warn(point, W_MATH_RENDER, err.to_string());
                ("math-block math-error", html_escape::encode_text(source).into_owned())
            }
            None => ("math-block", html_escape::encode_text(source).into_owned()),
        };
        change.add_token(BlockToken::open("div", point, name, 0).with_attribute("class", class));
        change.add_token(BlockToken::preserved_text(point, name, html, 1));
        change.add_token(BlockToken::close("div", point, name, 0));
        true
    }
}
