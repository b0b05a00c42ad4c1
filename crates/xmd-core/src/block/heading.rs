use once_cell::sync::Lazy;
use regex::Regex;

use super::{BlockContext, BlockRule};
use crate::cursor::InputCursor;
use crate::state_change::StateChange;
use crate::token::BlockToken;

const HEADING_TAGS: [(&str, &str); 6] = [
    ("#", "h1"),
    ("##", "h2"),
    ("###", "h3"),
    ("####", "h4"),
    ("#####", "h5"),
    ("######", "h6"),
];

static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\^[^\[\]]+\]").unwrap());
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]*)\](?:\([^()]*\)|\[[^\[\]]*\])").unwrap());

/// Heading text without footnote citations, link targets or inline markers,
/// as used for its id and its table-of-contents entry.
pub fn plain_text(text: &str) -> String {
    let text = CITATION.replace_all(text, "");
    let text = LINK.replace_all(&text, "$1");
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut index = 0;
    while index < chars.len() {
        let ch = chars[index];
        match ch {
            '\\' if chars.get(index + 1).is_some_and(|next| next.is_ascii_punctuation()) => {
                out.push(chars[index + 1]);
                index += 2;
                continue;
            }
            '`' | '*' | '$' => {}
            '_' => {
                let word = |at: Option<&char>| at.is_some_and(|c| c.is_alphanumeric() || *c == '_');
                let before = index.checked_sub(1).and_then(|at| chars.get(at));
                if word(before) && word(chars.get(index + 1)) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
        index += 1;
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `#` to `######` followed by whitespace and the heading text.
pub struct Heading;

impl BlockRule for Heading {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn process(
        &self,
        _ctx: &BlockContext<'_>,
        cursor: &mut InputCursor,
        change: &mut StateChange,
    ) -> bool {
        if change.interrupting.is_none() && !cursor.is_empty_line(-1) {
            return false;
        }
        let (point, line) = cursor.line_skip_whitespace(0);
        let Some((marker, rest)) = line.split_once(char::is_whitespace) else {
            return false;
        };
        let Some(level) = HEADING_TAGS.iter().position(|(hashes, _)| *hashes == marker) else {
            return false;
        };
        let text = rest.trim();
        if text.is_empty() {
            return false;
        }

        let tag = HEADING_TAGS[level].1;
        let token = change.add_token(BlockToken::wrapped(tag, point, self.name(), text, 0));
        change.register_heading(token, &plain_text(text), level as u8 + 1, point.line);
        cursor.next_line();
        true
    }
}
