use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("no syntax for language `{0}`")]
    UnknownLanguage(String),
    #[error("highlighting failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum MathError {
    #[error("math source failed to compile: {0}")]
    Compile(String),
    #[error("math renderer produced no output")]
    Empty,
}

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("url is empty")]
    Empty,
    #[error("url `{0}` contains whitespace or control characters")]
    InvalidCharacter(String),
}

/// Turns fenced code into highlighted HTML.
pub trait Highlighter {
    fn highlight(&self, code: &str, language: &str) -> Result<String, HighlightError>;
}

/// Turns math source into HTML; `display` selects block layout.
pub trait MathRenderer {
    fn render(&self, source: &str, display: bool) -> Result<String, MathError>;
}

pub trait UrlNormalizer {
    fn normalize(&self, raw: &str) -> Result<String, UrlError>;
}

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").unwrap());

/// Default link target normalization.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardUrls;

impl UrlNormalizer for StandardUrls {
    fn normalize(&self, raw: &str) -> Result<String, UrlError> {
        let url = raw.trim();
        if url.is_empty() {
            return Err(UrlError::Empty);
        }
        if url.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
            return Err(UrlError::InvalidCharacter(url.to_string()));
        }
        if EMAIL.is_match(url) {
            return Ok(format!("mailto:{url}"));
        }
        if url.starts_with('#')
            || url.starts_with('/')
            || url.starts_with("./")
            || url.starts_with("../")
            || SCHEME.is_match(url)
        {
            return Ok(url.to_string());
        }
        if url.starts_with("www.") {
            return Ok(format!("https://{url}"));
        }
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{StandardUrls, UrlError, UrlNormalizer};
    use rstest::rstest;

    #[rstest]
    #[case("someone@example.com", "mailto:someone@example.com")]
    #[case("#intro", "#intro")]
    #[case("https://example.com/a?b=c", "https://example.com/a?b=c")]
    #[case("www.example.com", "https://www.example.com")]
    #[case("docs/page.html", "docs/page.html")]
    #[case("mailto:a@b.co", "mailto:a@b.co")]
    fn normalizes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(StandardUrls.normalize(raw).unwrap(), expected);
    }

    #[test]
    fn rejects_embedded_whitespace() {
        assert!(matches!(
            StandardUrls.normalize("http://a b"),
            Err(UrlError::InvalidCharacter(_))
        ));
        assert!(matches!(StandardUrls.normalize("  "), Err(UrlError::Empty)));
    }
}
