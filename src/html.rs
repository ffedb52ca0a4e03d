//! Plain-text extraction from portal HTML
//!
//! Notice bodies and assignment descriptions arrive as HTML fragments.
//! For list display and search only the readable text matters, so this
//! strips comments and tags, decodes entities and collapses whitespace.

use regex_lite::Regex;

/// Strip an HTML fragment down to plain text
pub fn strip_tags(html: &str) -> String {
    // Comments first, so commented-out markup never leaks into the text
    let text = Regex::new(r"(?s)<!--.*?-->")
        .map(|re| re.replace_all(html, " ").to_string())
        .unwrap_or_else(|_| html.to_string());

    let text = Regex::new(r"<[^>]*>")
        .map(|re| re.replace_all(&text, " ").to_string())
        .unwrap_or(text);

    let text = html_escape::decode_html_entities(&text)
        .to_string()
        .replace('\u{a0}', " ");

    let text = Regex::new(r"\s+")
        .map(|re| re.replace_all(&text, " ").to_string())
        .unwrap_or(text);

    text.trim().to_string()
}
