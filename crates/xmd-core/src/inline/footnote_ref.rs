use once_cell::sync::Lazy;
use regex::Regex;

use super::{InlineRule, InlineState};
use crate::document::TokenRef;
use crate::label::normalize_label;
use crate::token::InlineToken;

static FOOTNOTE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\^([\w-]+)\]").unwrap());

/// `[^label]` becomes `<sup><a>[N]</a></sup>`, numbered in citation order.
///
/// The anchor's `href` is filled in by the document state once the
/// definition is known, which may be later in the document.
pub struct FootnoteRef;

impl InlineRule for FootnoteRef {
    fn name(&self) -> &'static str {
        "footnote_ref"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let mut matched = false;
        for captures in state.match_all(&FOOTNOTE_REF) {
            let (Some(whole), Some(label)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let (start, end) = (whole.start(), whole.end());
            let anchor = TokenRef::Inline {
                block: state.block(),
                start: label.start(),
            };
            let point = state.point_at(start);
            let citation = state
                .document
                .resolve_footnote_ref(label.as_str(), anchor, point);

            let name = self.name();
            let mut sup = InlineToken::open("sup", start, label.start(), name);
            if citation.first {
                sup = sup.with_attribute("id", format!("ref-{}", normalize_label(label.as_str())));
            }
            state.add(sup);
            state.add(InlineToken::wrapped(
                "a",
                label.start(),
                label.end(),
                name,
                format!("[{}]", citation.number),
            ));
            state.add(InlineToken::close("sup", label.end(), end, name));
            matched = true;
        }
        matched
    }
}
