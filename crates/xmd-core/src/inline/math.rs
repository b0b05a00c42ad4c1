use once_cell::sync::Lazy;
use regex::Regex;

use super::{InlineRule, InlineState};
use crate::diagnostic::W_MATH_RENDER;
use crate::token::InlineToken;

static INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([^$\s](?:[^$]*[^$\s])?)\$").unwrap());

/// `$source$` rendered inline; the source may not start or end with whitespace.
pub struct InlineMath;

impl InlineRule for InlineMath {
    fn name(&self) -> &'static str {
        "inline_math"
    }

    fn process(&self, state: &mut InlineState<'_>) -> bool {
        let mut matched = false;
        for captures in state.match_all(&INLINE_MATH) {
            let (Some(whole), Some(source)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let (start, end) = (whole.start(), whole.end());
            let rendered = state.options.math.map(|math| math.render(source.as_str(), false));
            let (class, html) = match rendered {
                Some(Ok(html)) => ("math-inline", html),
                Some(Err(err)) => {
                    state.warn(start, W_MATH_RENDER, err.to_string());
                    (
                        "math-inline math-error",
                        html_escape::encode_text(source.as_str()).into_owned(),
                    )
                }
                None => (
                    "math-inline",
                    html_escape::encode_text(source.as_str()).into_owned(),
                ),
            };
            let name = self.name();
            state.add(InlineToken::open("span", start, start + 1, name).with_attribute("class", class));
            state.add(InlineToken::preserved_text(start + 1, end - 1, name, html));
            state.add(InlineToken::close("span", end - 1, end, name));
            matched = true;
        }
        matched
    }
}
