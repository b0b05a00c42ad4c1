use crate::parser::ParsedState;
use crate::token::{Attributes, BlockToken, InlineToken, TagKind, Token};
use ammonia::Builder;
use std::collections::{HashMap, HashSet};

/// Emits raw, un-sanitized HTML for a parsed document.
pub fn render(state: &ParsedState) -> String {
    // Deterministic formatting: 2-space indentation per depth and LF newlines.
    let mut writer = HtmlWriter::new();
    for token in &state.tokens {
        emit_block(&mut writer, token);
    }
    writer.finish()
}

/// Emits HTML and sanitizes it according to a safe allow-list.
pub fn render_sanitized(state: &ParsedState) -> String {
    let raw_html = render(state);

    let tags: HashSet<&'static str> = [
        "a", "br", "code", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "ol",
        "p", "pre", "span", "strong", "sup", "table", "tbody", "td", "th", "thead", "tr", "ul",
        // Math output
        "svg", "g", "defs", "path", "clipPath", "symbol", "use", "image",
    ]
    .iter()
    .copied()
    .collect();

    let mut generic_attributes: HashSet<&'static str> = HashSet::new();
    generic_attributes.insert("class");
    generic_attributes.insert("id");

    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", ["href", "title"].iter().copied().collect());
    tag_attributes.insert("th", ["style"].iter().copied().collect());
    tag_attributes.insert("td", ["style"].iter().copied().collect());
    tag_attributes.insert("span", ["style"].iter().copied().collect());
    tag_attributes.insert(
        "svg",
        ["xmlns", "viewBox", "width", "height", "style"]
            .iter()
            .copied()
            .collect(),
    );
    tag_attributes.insert(
        "g",
        ["transform", "fill", "fill-rule", "stroke", "stroke-width", "clip-path"]
            .iter()
            .copied()
            .collect(),
    );
    tag_attributes.insert(
        "path",
        ["d", "fill", "fill-rule", "stroke", "stroke-width", "stroke-linecap"]
            .iter()
            .copied()
            .collect(),
    );
    tag_attributes.insert("symbol", ["overflow"].iter().copied().collect());
    tag_attributes.insert("use", ["href", "xlink:href", "x", "y"].iter().copied().collect());
    tag_attributes.insert(
        "image",
        ["href", "xlink:href", "width", "height", "transform"]
            .iter()
            .copied()
            .collect(),
    );

    Builder::new()
        .tags(tags)
        .generic_attributes(generic_attributes)
        .tag_attributes(tag_attributes)
        .clean(&raw_html)
        .to_string()
}

/// Nested `ul` of links to the document's headings.
pub fn render_toc(state: &ParsedState) -> String {
    let mut writer = HtmlWriter::new();
    let mut levels: Vec<u8> = Vec::new();
    for heading in &state.headings {
        while let Some(&top) = levels.last()
            && top > heading.level
        {
            levels.pop();
            writer.line(levels.len(), "</ul>");
        }
        if levels.last().is_none_or(|&top| top < heading.level) {
            let class = if levels.is_empty() { " class=\"toc\"" } else { "" };
            writer.line(levels.len(), &format!("<ul{class}>"));
            levels.push(heading.level);
        }
        writer.line(
            levels.len(),
            &format!(
                "<li><a href=\"#{}\">{}</a></li>",
                escape_attr(&heading.id),
                escape_text(&heading.text)
            ),
        );
    }
    while levels.pop().is_some() {
        writer.line(levels.len(), "</ul>");
    }
    writer.finish()
}

struct HtmlWriter {
    out: String,
    /// Open `pre` elements; their content is written without layout.
    pre: usize,
}

impl HtmlWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            pre: 0,
        }
    }

    fn line(&mut self, depth: usize, line: &str) {
        if self.pre > 0 {
            self.out.push_str(line);
            return;
        }
        self.indent(depth);
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn open_pre(&mut self, depth: usize, tag: &str) {
        if self.pre == 0 {
            self.indent(depth);
        }
        self.out.push_str(tag);
        self.pre += 1;
    }

    fn close_pre(&mut self, tag: &str) {
        self.out.push_str(tag);
        self.pre = self.pre.saturating_sub(1);
        if self.pre == 0 {
            self.out.push('\n');
        }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn finish(mut self) -> String {
        if self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

fn emit_block(writer: &mut HtmlWriter, token: &BlockToken) {
    let depth = token.depth;
    match token.kind {
        TagKind::Open if token.tag == "pre" => writer.open_pre(depth, &open_tag(token)),
        TagKind::Close if token.tag == "pre" => writer.close_pre("</pre>"),
        TagKind::Open => writer.line(depth, &open_tag(token)),
        TagKind::Close => writer.line(depth, &format!("</{}>", token.tag)),
        TagKind::SelfClosing => writer.line(depth, &void_tag(token)),
        TagKind::Wrapped => writer.line(
            depth,
            &format!("{}{}</{}>", open_tag(token), block_content(token), token.tag),
        ),
        TagKind::Text => {
            let content = block_content(token);
            // Empty once reference definitions consumed the line.
            if !content.is_empty() {
                writer.line(depth, &content);
            }
        }
        TagKind::PreservedText => writer.line(depth, token.content()),
    }
}

fn block_content(token: &BlockToken) -> String {
    if token.parse_content {
        render_inlines(&token.inline_tokens)
    } else {
        escape_text(token.content())
    }
}

fn render_inlines(tokens: &[InlineToken]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token.kind {
            TagKind::Open => out.push_str(&open_tag(token)),
            TagKind::Close => {
                out.push_str("</");
                out.push_str(&token.tag);
                out.push('>');
            }
            TagKind::SelfClosing => out.push_str(&void_tag(token)),
            TagKind::Wrapped => {
                out.push_str(&open_tag(token));
                out.push_str(&escape_text(token.content()));
                out.push_str("</");
                out.push_str(&token.tag);
                out.push('>');
            }
            TagKind::Text => out.push_str(&escape_text(token.content())),
            TagKind::PreservedText => out.push_str(token.content()),
        }
    }
    out
}

fn open_tag(token: &Token) -> String {
    format!("<{}{}>", token.tag, attributes(&token.attributes))
}

fn void_tag(token: &Token) -> String {
    format!("<{}{} />", token.tag, attributes(&token.attributes))
}

fn attributes(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!(" {key}=\"{}\"", escape_attr(value)))
        .collect()
}

fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn escape_attr(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}
