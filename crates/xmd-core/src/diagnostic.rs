use crate::cursor::Point;

pub const W_CODE_UNCLOSED: &str = "W_CODE_UNCLOSED";
pub const W_MATH_UNCLOSED: &str = "W_MATH_UNCLOSED";
pub const W_MATH_RENDER: &str = "W_MATH_RENDER";
pub const W_FOOTNOTE_DUP: &str = "W_FOOTNOTE_DUP";
pub const W_FOOTNOTE_MISSING: &str = "W_FOOTNOTE_MISSING";
pub const W_REF_MISSING: &str = "W_REF_MISSING";
pub const W_URL_INVALID: &str = "W_URL_INVALID";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub point: Point,
    pub severity: DiagnosticSeverity,
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        point: Point,
        severity: DiagnosticSeverity,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            point,
            severity,
            code,
            message: message.into(),
        }
    }

    /// Builds a warning and forwards it to the `log` facade.
    pub fn warning(point: Point, code: &'static str, message: impl Into<String>) -> Self {
        let diagnostic = Self::new(point, DiagnosticSeverity::Warning, code, message);
        log::warn!(
            "{}:{} {} {}",
            point.line,
            point.column,
            diagnostic.code,
            diagnostic.message
        );
        diagnostic
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}
