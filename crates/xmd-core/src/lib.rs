mod backend;
mod block;
mod cursor;
mod diagnostic;
mod document;
mod emit;
mod inline;
mod label;
mod math;
mod parser;
mod state_change;
mod token;

pub use backend::{
    HighlightError, Highlighter, MathError, MathRenderer, StandardUrls, UrlError, UrlNormalizer,
};
pub use block::{
    BLOCK_RULES, BlockContext, BlockMath, BlockRule, CodeBlock, FootnoteDef, Heading, List,
    Paragraph, Table, probe_terminators,
};
pub use cursor::{InputCursor, Point};
pub use diagnostic::{
    Diagnostic, DiagnosticSeverity, W_CODE_UNCLOSED, W_FOOTNOTE_DUP, W_FOOTNOTE_MISSING,
    W_MATH_RENDER, W_MATH_UNCLOSED, W_REF_MISSING, W_URL_INVALID,
};
pub use document::{
    Citation, DocumentState, HeadingEntry, OnNumber, Patch, PendingLink, Reference, TokenRef,
};
pub use emit::{render, render_sanitized, render_toc};
pub use inline::{INLINE_RULES, InlineRule, InlineState, parse_inline};
pub use label::{heading_id, normalize_label};
pub use math::TypstMath;
pub use parser::{ParseOptions, ParsedBlock, ParsedState, parse, parse_with_options};
pub use state_change::StateChange;
pub use token::{Attributes, BlockToken, InlineToken, TagKind, Token};
