use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme as SyntectTheme, ThemeSet};
use syntect::html::{IncludeBackground, styled_line_to_highlighted_html};
use syntect::parsing::SyntaxSet;
use xmd_core::{HighlightError, Highlighter};

const BASE_CSS: &str = include_str!("../assets/xmd.css");
pub const STYLESHEET_FILE: &str = "xmd.css";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "auto" => Ok(Theme::Auto),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme `{other}`, expected auto | light | dark")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    theme: Theme,
    title: Option<String>,
    custom_vars: BTreeMap<String, String>,
}

impl Renderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            title: None,
            custom_vars: BTreeMap::new(),
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Overrides one CSS custom property, e.g. `--xmd-accent`.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn stylesheet(&self) -> String {
        let mut out = String::new();
        let (light_vars, dark_vars) = default_theme_vars();

        match self.theme {
            Theme::Auto => {
                out.push_str(&root_block(&light_vars, true));
                out.push_str("@media (prefers-color-scheme: dark) {\n");
                out.push_str(&indent_root_block(&dark_vars));
                out.push_str("}\n");
            }
            Theme::Light => {
                out.push_str(&root_block(&light_vars, true));
            }
            Theme::Dark => {
                out.push_str(&root_block(&dark_vars, true));
            }
        }

        if !self.custom_vars.is_empty() {
            out.push_str(&root_block(&self.custom_vars, false));
        }

        out.push_str(BASE_CSS);
        out
    }

    /// Wraps a rendered fragment into a standalone document. Without inline
    /// CSS the page links to the stylesheet written by [`Self::generate_files`].
    pub fn embed_html(&self, html: &str, with_inline_css: bool) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n");
        out.push_str("<html lang=\"en\">\n");
        out.push_str("<head>\n");
        out.push_str("  <meta charset=\"utf-8\" />\n");
        out.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
        if let Some(title) = &self.title {
            out.push_str(&format!(
                "  <title>{}</title>\n",
                html_escape::encode_text(title)
            ));
        }
        if with_inline_css {
            out.push_str("  <style>\n");
            out.push_str(&self.stylesheet());
            out.push_str("\n  </style>\n");
        } else {
            out.push_str(&format!(
                "  <link rel=\"stylesheet\" href=\"{STYLESHEET_FILE}\" />\n"
            ));
        }
        out.push_str("</head>\n");
        out.push_str("<body>\n");
        out.push_str("<main class=\"xmd\">\n");
        out.push_str(html);
        if !html.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("</main>\n");
        out.push_str("</body>\n");
        out.push_str("</html>\n");
        out
    }

    pub fn generate_files(&self, out_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(out_dir)?;
        fs::write(out_dir.join(STYLESHEET_FILE), self.stylesheet())?;
        log::debug!("wrote {}", out_dir.join(STYLESHEET_FILE).display());
        Ok(())
    }

    pub fn highlighter(&self) -> SyntectHighlighter {
        SyntectHighlighter::new(self.theme)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Theme::Auto)
    }
}

/// Code highlighting through syntect's bundled syntaxes and themes.
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    theme: SyntectTheme,
}

impl SyntectHighlighter {
    pub fn new(theme: Theme) -> Self {
        let theme_set = ThemeSet::load_defaults();
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme: pick_theme(theme, &theme_set),
        }
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, language: &str) -> Result<String, HighlightError> {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(language)
            .ok_or_else(|| HighlightError::UnknownLanguage(language.to_string()))?;
        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut lines = Vec::new();
        for line in code.split('\n') {
            let with_newline = format!("{line}\n");
            let ranges: Vec<_> = highlighter
                .highlight_line(&with_newline, &self.syntax_set)
                .map_err(|err| HighlightError::Failed(err.to_string()))?
                .into_iter()
                .map(|(style, text)| (style, text.trim_end_matches('\n')))
                .collect();
            let html = styled_line_to_highlighted_html(&ranges, IncludeBackground::No)
                .map_err(|err| HighlightError::Failed(err.to_string()))?;
            lines.push(strip_font_weight(&html));
        }
        Ok(lines.join("\n"))
    }
}

fn default_theme_vars() -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let light = BTreeMap::from([
        ("--xmd-bg".to_string(), "#fbfbf8".to_string()),
        ("--xmd-fg".to_string(), "#1f2328".to_string()),
        ("--xmd-muted".to_string(), "#5f6b76".to_string()),
        ("--xmd-border".to_string(), "#d8dee4".to_string()),
        ("--xmd-accent".to_string(), "#2b6cb0".to_string()),
        ("--xmd-code-bg".to_string(), "#f4f6f8".to_string()),
        ("--xmd-code-fg".to_string(), "#1f2328".to_string()),
        ("--xmd-error".to_string(), "#c53030".to_string()),
    ]);

    let dark = BTreeMap::from([
        ("--xmd-bg".to_string(), "#0e1116".to_string()),
        ("--xmd-fg".to_string(), "#e6edf3".to_string()),
        ("--xmd-muted".to_string(), "#9aa4af".to_string()),
        ("--xmd-border".to_string(), "#2a313b".to_string()),
        ("--xmd-accent".to_string(), "#63b3ed".to_string()),
        ("--xmd-code-bg".to_string(), "#202634".to_string()),
        ("--xmd-code-fg".to_string(), "#f0f6fc".to_string()),
        ("--xmd-error".to_string(), "#fc8181".to_string()),
    ]);

    (light, dark)
}

fn format_vars(vars: &BTreeMap<String, String>, indent: &str) -> String {
    let mut out = String::new();
    for (key, value) in vars {
        out.push_str(indent);
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push_str(";\n");
    }
    out
}

fn root_block(vars: &BTreeMap<String, String>, include_color_scheme: bool) -> String {
    let mut out = String::new();
    out.push_str(":root {\n");
    if include_color_scheme {
        out.push_str("  color-scheme: light dark;\n");
    }
    out.push_str(&format_vars(vars, "  "));
    out.push_str("}\n");
    out
}

fn indent_root_block(vars: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    out.push_str("  :root {\n");
    out.push_str("    color-scheme: light dark;\n");
    out.push_str(&format_vars(vars, "    "));
    out.push_str("  }\n");
    out
}

fn pick_theme(theme: Theme, theme_set: &ThemeSet) -> SyntectTheme {
    let candidates = match theme {
        Theme::Dark => ["base16-ocean.dark", "base16-eighties.dark", "base16-mocha.dark"],
        Theme::Light | Theme::Auto => ["InspiredGitHub", "Solarized (light)", "base16-ocean.light"],
    };
    candidates
        .iter()
        .find_map(|name| theme_set.themes.get(*name))
        .or_else(|| theme_set.themes.values().next())
        .cloned()
        .unwrap_or_default()
}

fn strip_font_weight(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(pos) = rest.find("font-weight:") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + "font-weight:".len()..];
        let end = match tail.find(';') {
            Some(index) => index + 1,
            None => {
                rest = "";
                break;
            }
        };
        rest = &tail[end..];
    }
    out.push_str(rest);
    out
}
