// src/utils/html.rs

//! Comment markup cleaning.

use scraper::{Html, Node};

/// Reduce a comment's HTML to plaintext.
///
/// Line breaks become newlines, every other tag is dropped and entities are
/// decoded.
pub fn clean_comment(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(el) if el.name() == "br" => text.push('\n'),
            _ => {}
        }
    }

    text.trim().to_string()
}
