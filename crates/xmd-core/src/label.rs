/// Turns a reference or footnote label into its lookup key and id fragment.
///
/// Lowercases and trims, collapses every run of non-word characters into a
/// single `-`, strips leading and trailing hyphens, and prefixes `id-` when the
/// result would start with a digit. A label without word characters keeps its
/// lowercased text with whitespace collapsed, so distinct punctuation labels
/// stay distinct.
pub fn normalize_label(text: &str) -> String {
    let slug = slugify(text);
    if !slug.is_empty() {
        return slug;
    }
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Id for a heading text; `section` when nothing word-like remains.
pub fn heading_id(text: &str) -> String {
    let slug = slugify(text);
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for ch in text.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() || ch == '_' {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    if out.starts_with(|ch: char| ch.is_ascii_digit()) {
        out.insert_str(0, "id-");
    }
    out
}
