use super::{BlockContext, BlockRule};
use crate::cursor::InputCursor;
use crate::diagnostic::W_CODE_UNCLOSED;
use crate::state_change::StateChange;
use crate::token::BlockToken;

const FENCE: &str = "```";

/// Backtick-fenced code, emitted as `pre > code` with preserved content.
pub struct CodeBlock;

impl BlockRule for CodeBlock {
    fn name(&self) -> &'static str {
        "codeblock_fenced"
    }

    fn process(
        &self,
        ctx: &BlockContext<'_>,
        cursor: &mut InputCursor,
        change: &mut StateChange,
    ) -> bool {
        let (point, line) = cursor.line_skip_whitespace(0);
        let Some(info) = line.strip_prefix(FENCE) else {
            return false;
        };
        let language = info
            .trim_start_matches('`')
            .split_whitespace()
            .next()
            .map(str::to_string);

        let mut lines = Vec::new();
        let mut closed = false;
        while let Some(line) = cursor.next_line() {
            if is_closing_fence(line) {
                closed = true;
                cursor.next_line();
                break;
            }
            lines.push(line.to_string());
        }
        if !closed {
            change.warn(point, W_CODE_UNCLOSED, "code fence is never closed");
        }

        let code = lines.join("\n");
        let html = highlight(ctx, &code, language.as_deref());

        let name = self.name();
        change.add_token(BlockToken::open("pre", point, name, 0));
        let mut code_open = BlockToken::open("code", point, name, 1);
        if let Some(language) = &language {
            code_open = code_open
                .with_attribute("class", format!("language-{language}"))
                .with_annotation(language.as_str());
        }
        change.add_token(code_open);
        change.add_token(BlockToken::preserved_text(point, name, html, 2));
        change.add_token(BlockToken::close("code", point, name, 1));
        change.add_token(BlockToken::close("pre", point, name, 0));
        true
    }
}

fn is_closing_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= FENCE.len() && trimmed.chars().all(|ch| ch == '`')
}

fn highlight(ctx: &BlockContext<'_>, code: &str, language: Option<&str>) -> String {
    if let (Some(highlighter), Some(language)) = (ctx.options.highlighter, language) {
        match highlighter.highlight(code, language) {
            Ok(html) => return html,
            Err(err) => log::debug!("falling back to plain code: {err}"),
        }
    }
    html_escape::encode_text(code).into_owned()
}

#[cfg(test)]
mod tests {
    use super::CodeBlock;
    use crate::backend::{HighlightError, Highlighter};
    use crate::block::testing::{run, run_with, shape};
    use crate::document::DocumentState;
    use crate::parser::ParseOptions;

    struct Upper;

    impl Highlighter for Upper {
        fn highlight(&self, code: &str, language: &str) -> Result<String, HighlightError> {
            if language == "rust" {
                Ok(code.to_uppercase())
            } else {
                Err(HighlightError::UnknownLanguage(language.to_string()))
            }
        }
    }

    #[test]
    fn emits_pre_code_with_escaped_body() {
        let (accepted, change, cursor) = run(&CodeBlock, "```rust\nlet a = 1 < 2;\n```\nafter");
        assert!(accepted);
        assert_eq!(
            shape(change.tokens()),
            vec![
                "open:pre@0",
                "open:code@1",
                "raw:text:let a = 1 &lt; 2;@2",
                "close:code@1",
                "close:pre@0",
            ]
        );
        assert_eq!(change.tokens()[1].attributes.get("class"), Some("language-rust"));
        assert_eq!(cursor.current_line(), "after");
        assert!(change.diagnostics().is_empty());
    }

    #[test]
    fn unclosed_fence_runs_to_end_and_warns() {
        let (accepted, change, cursor) = run(&CodeBlock, "```\nfn main() {}\n");
        assert!(accepted);
        assert!(cursor.is_at_eof());
        assert_eq!(change.tokens().len(), 5);
        assert_eq!(change.diagnostics()[0].code, "W_CODE_UNCLOSED");
    }

    #[test]
    fn highlighter_failure_falls_back() {
        let document = DocumentState::new();
        let options = ParseOptions::default().without_math().with_highlighter(&Upper);

        let (_, change, _) = run_with(&CodeBlock, "```rust\nabc\n```", &document, &options);
        assert_eq!(change.tokens()[2].content(), "ABC");

        let (_, change, _) = run_with(&CodeBlock, "```zz\na<b\n```", &document, &options);
        assert_eq!(change.tokens()[2].content(), "a&lt;b");
        assert!(change.diagnostics().is_empty());
    }

    #[test]
    fn declines_other_lines() {
        let (accepted, _, cursor) = run(&CodeBlock, "`` not a fence");
        assert!(!accepted);
        assert_eq!(cursor.current_point().line, 1);
    }
}
