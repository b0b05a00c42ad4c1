use super::{InlineRule, InlineState};
use crate::token::InlineToken;

/// `\` before ASCII punctuation yields the punctuation as literal text.
pub struct Escape;

impl InlineRule for Escape {
    fn name(&self) -> &'static str {
        "escape"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let bytes = state.text().as_bytes();
        let mut escaped_any = false;
        let mut pos = 0;
        while pos + 1 < bytes.len() {
            if bytes[pos] == b'\\' && bytes[pos + 1].is_ascii_punctuation() {
                let literal = char::from(bytes[pos + 1]).to_string();
                if state.add(InlineToken::text(pos, pos + 2, self.name(), literal)) {
                    state.escape(pos + 1);
                    escaped_any = true;
                }
                pos += 2;
            } else {
                pos += 1;
            }
        }
        escaped_any
    }
}
