use super::{InlineRule, InlineState};
use crate::token::InlineToken;

#[derive(Clone, Copy, Debug)]
struct Delimiter {
    marker: u8,
    start: usize,
    len: usize,
    can_open: bool,
    can_close: bool,
    /// Start of the enclosing link or span, if any; pairs never cross it.
    scope: Option<usize>,
}

/// `*em*`, `_em_`, `**strong**`, `__strong__`.
pub struct Emphasis;

impl InlineRule for Emphasis {
    fn name(&self) -> &'static str {
        "emphasis"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let delimiters = delimiter_runs(state);
        let mut openers: Vec<Delimiter> = Vec::new();
        let mut pairs = Vec::new();

        for delimiter in delimiters {
            if delimiter.can_close {
                let opener = openers.iter().rposition(|opener| {
                    opener.marker == delimiter.marker
                        && opener.len == delimiter.len
                        && opener.scope == delimiter.scope
                });
                if let Some(index) = opener {
                    pairs.push((openers[index], delimiter));
                    openers.truncate(index);
                    continue;
                }
            }
            if delimiter.can_open {
                openers.push(delimiter);
            }
        }

        let name = self.name();
        for (open, close) in &pairs {
            let tag = if open.len == 2 { "strong" } else { "em" };
            state.add(InlineToken::open(tag, open.start, open.start + open.len, name));
            state.add(InlineToken::close(tag, close.start, close.start + close.len, name));
        }
        !pairs.is_empty()
    }
}

/// Unclaimed `*`/`_` runs of length one or two with their flanking flags.
fn delimiter_runs(state: &InlineState<'_>) -> Vec<Delimiter> {
    let text = state.text();
    let bytes = text.as_bytes();
    let mut runs = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let marker = bytes[pos];
        if !matches!(marker, b'*' | b'_') || state.is_claimed(pos) || state.is_escaped(pos) {
            pos += 1;
            continue;
        }
        let start = pos;
        while pos < bytes.len() && bytes[pos] == marker && !state.is_claimed(pos) {
            pos += 1;
        }
        let len = pos - start;
        if len > 2 {
            continue;
        }

        let before = text[..start].chars().next_back();
        let after = text[pos..].chars().next();
        let mut can_open = after.is_some_and(|ch| !ch.is_whitespace());
        let mut can_close = before.is_some_and(|ch| !ch.is_whitespace());
        if marker == b'_'
            && before.is_some_and(char::is_alphanumeric)
            && after.is_some_and(char::is_alphanumeric)
        {
            can_open = false;
            can_close = false;
        }
        if !can_open && !can_close {
            continue;
        }
        runs.push(Delimiter {
            marker,
            start,
            len,
            can_open,
            can_close,
            scope: state.enclosing(start).map(|token| token.position_start),
        });
    }
    runs
}
