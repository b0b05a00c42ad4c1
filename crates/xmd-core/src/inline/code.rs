use super::{InlineRule, InlineState};
use crate::token::InlineToken;

/// Backtick runs paired with the next run of the same length.
pub struct CodeSpan;

impl InlineRule for CodeSpan {
    fn name(&self) -> &'static str {
        "code"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let text = state.text();
        let runs = backtick_runs(state);
        let mut matched = false;
        let mut index = 0;
        while index < runs.len() {
            let (open, width) = runs[index];
            let Some(offset) = runs[index + 1..].iter().position(|&(_, len)| len == width) else {
                index += 1;
                continue;
            };
            let close = runs[index + 1 + offset].0;
            let inner = &text[open + width..close];
            let content = match inner.strip_prefix(' ').and_then(|s| s.strip_suffix(' ')) {
                Some(stripped) if !stripped.trim().is_empty() => stripped,
                _ => inner,
            };
            state.add_over(InlineToken::wrapped(
                "code",
                open,
                close + width,
                self.name(),
                content,
            ));
            matched = true;
            index += offset + 2;
        }
        matched
    }
}

/// `(start, length)` of every backtick run not claimed by an escape.
fn backtick_runs(state: &InlineState<'_>) -> Vec<(usize, usize)> {
    let bytes = state.text().as_bytes();
    let mut runs = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] == b'`' && !state.is_claimed(pos) {
            let start = pos;
            while pos < bytes.len() && bytes[pos] == b'`' && !state.is_claimed(pos) {
                pos += 1;
            }
            runs.push((start, pos - start));
        } else {
            pos += 1;
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::CodeSpan;
    use crate::inline::testing::{inline, only};

    #[test]
    fn wraps_code_span() {
        assert_eq!(
            only(&CodeSpan, "use `a*b` here"),
            vec![
                "text:text:use @0..4",
                "wrap:code:a*b@4..9",
                "text:text: here@9..14",
            ]
        );
    }

    #[test]
    fn double_backticks_allow_single_inside() {
        assert_eq!(
            only(&CodeSpan, "``a ` b``"),
            vec!["wrap:code:a ` b@0..9"]
        );
    }

    #[test]
    fn unmatched_run_stays_literal() {
        assert_eq!(only(&CodeSpan, "a ` b"), vec!["text:text:a ` b@0..5"]);
    }

    #[test]
    fn escapes_inside_code_are_kept_verbatim() {
        assert_eq!(inline(r"`a\*b` *c*")[0], r"wrap:code:a\*b@0..6");
    }

    #[test]
    fn escaped_backtick_does_not_open() {
        assert_eq!(
            inline(r"\`not code`"),
            vec!["text:text:`@0..2", "text:text:not code`@2..11"]
        );
    }
}
