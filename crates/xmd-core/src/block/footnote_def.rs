use once_cell::sync::Lazy;
use regex::Regex;

use super::{BlockContext, BlockRule};
use crate::cursor::InputCursor;
use crate::diagnostic::W_FOOTNOTE_DUP;
use crate::label::normalize_label;
use crate::state_change::StateChange;
use crate::token::{BlockToken, Token};

static FOOTNOTE_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[\^([\w-]+)\]:\s*(\S.*)$").unwrap());

/// `[^label]: text`, collected into the footer.
pub struct FootnoteDef;

impl BlockRule for FootnoteDef {
    fn name(&self) -> &'static str {
        "footnote_def"
    }

    fn process(
        &self,
        ctx: &BlockContext<'_>,
        cursor: &mut InputCursor,
        change: &mut StateChange,
    ) -> bool {
        let point = cursor.current_point();
        let line = cursor.current_line();
        let Some(captures) = FOOTNOTE_DEF.captures(line) else {
            return false;
        };
        let label = captures[1].to_string();
        let text = captures[2].trim_end().to_string();
        let name = self.name();

        if ctx.document.has_footnote(&label) || change.defines_footnote(&label) {
            change.warn(
                point,
                W_FOOTNOTE_DUP,
                format!("footnote `{label}` is already defined; keeping the first definition"),
            );
            let line = line.trim().to_string();
            change.add_token(BlockToken::open("p", point, name, 0));
            change.add_token(BlockToken::text(point, name, line, 1).verbatim());
            change.add_token(BlockToken::close("p", point, name, 0));
            cursor.next_line();
            return true;
        }

        change.add_footer_token(
            BlockToken::open("p", point, name, 0).with_attribute("class", "footnote-def"),
        );
        let destination = change.add_footer_token(
            BlockToken::wrapped("span", point, name, text, 1).with_annotation("footnote-def"),
        );
        change.register_footnote_def(
            &label,
            destination,
            Box::new(|number: usize, token: &mut Token| {
                token.content = Some(format!("{number}. {}", token.content()));
            }),
        );
        change.add_footer_token(
            BlockToken::wrapped("a", point, name, "\u{21a9}", 1)
                .with_attribute("class", "footnote-backref")
                .with_attribute("href", format!("#ref-{}", normalize_label(&label)))
                .verbatim(),
        );
        change.add_footer_token(BlockToken::close("p", point, name, 0));
        cursor.next_line();
        true
    }
}
