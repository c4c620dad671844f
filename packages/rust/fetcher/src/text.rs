//! Visible-text extraction from HTML.

use scraper::{ElementRef, Html, Node};

/// Subtrees whose text never reaches the reader (or is boilerplate chrome).
const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "nav", "header", "footer",
    "aside", "form",
];

/// Extract visible text in document order, collapse whitespace, and cut to
/// at most `budget` characters. Malformed markup is tolerated.
pub fn extract_visible_text(html: &str, budget: usize) -> String {
    let doc = Html::parse_document(html);

    let mut raw = String::new();
    collect_text(doc.root_element(), &mut raw);

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, budget)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            if !STRIPPED_TAGS.contains(&el.value().name()) {
                collect_text(el, out);
            }
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

/// First `budget` characters (not bytes) of `s`.
pub fn truncate_chars(s: &str, budget: usize) -> String {
    match s.char_indices().nth(budget) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
