//! Inline-run rendering shared by the exporters.
//!
//! Marks are flat annotations on a text leaf, so both targets wrap the leaf
//! text from the inside out: code first, then emphasis, then the rest.

use blockdoc_engine::editing::{ElementChild, ElementNode, PropValue, TextLeaf};

/// Checked state of a todo-list item.
pub(crate) fn checked(item: &ElementNode) -> bool {
    matches!(item.props.get("checked"), Some(PropValue::Bool(true)))
}

pub(crate) fn html_leaf(leaf: &TextLeaf) -> String {
    let mut out = html_escape::encode_text(&leaf.text).into_owned();
    if leaf.marks.contains_key("code") {
        out = format!("<code>{out}</code>");
    }
    if leaf.marks.contains_key("italic") {
        out = format!("<em>{out}</em>");
    }
    if leaf.marks.contains_key("bold") {
        out = format!("<strong>{out}</strong>");
    }
    if leaf.marks.contains_key("strikethrough") {
        out = format!("<s>{out}</s>");
    }
    if let Some(PropValue::Str(color)) = leaf.marks.get("highlight") {
        out = format!(
            "<mark style=\"background-color: {}\">{out}</mark>",
            html_escape::encode_double_quoted_attribute(color)
        );
    }
    out
}

/// Render a child run as HTML. Link elements become anchors; any other
/// nested element contributes its inline content.
pub(crate) fn html_children(children: &[ElementChild]) -> String {
    let mut out = String::new();
    for child in children {
        match child {
            ElementChild::Text(leaf) => out.push_str(&html_leaf(leaf)),
            ElementChild::Element(node) if node.kind == "link" => {
                let href = match node.props.get("href") {
                    Some(PropValue::Str(url)) => url.as_str(),
                    _ => "#",
                };
                out.push_str(&format!(
                    "<a href=\"{}\">{}</a>",
                    html_escape::encode_double_quoted_attribute(href),
                    html_children(&node.children)
                ));
            }
            ElementChild::Element(node) => out.push_str(&html_children(&node.children)),
        }
    }
    out
}

pub(crate) fn markdown_leaf(leaf: &TextLeaf) -> String {
    let mut out = leaf.text.clone();
    if out.is_empty() {
        return out;
    }
    if leaf.marks.contains_key("code") {
        out = format!("`{out}`");
    }
    if leaf.marks.contains_key("italic") {
        out = format!("*{out}*");
    }
    if leaf.marks.contains_key("bold") {
        out = format!("**{out}**");
    }
    if leaf.marks.contains_key("strikethrough") {
        out = format!("~~{out}~~");
    }
    out
}

pub(crate) fn markdown_children(children: &[ElementChild]) -> String {
    let mut out = String::new();
    for child in children {
        match child {
            ElementChild::Text(leaf) => out.push_str(&markdown_leaf(leaf)),
            ElementChild::Element(node) if node.kind == "link" => {
                let href = match node.props.get("href") {
                    Some(PropValue::Str(url)) => url.as_str(),
                    _ => "",
                };
                out.push_str(&format!("[{}]({href})", markdown_children(&node.children)));
            }
            ElementChild::Element(node) => out.push_str(&markdown_children(&node.children)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_html_leaf_escapes_and_wraps_marks() {
        let leaf = TextLeaf::new("a < b").with_mark("bold", true);
        assert_eq!(html_leaf(&leaf), "<strong>a &lt; b</strong>");
    }

    #[test]
    fn test_html_leaf_nests_code_inside_emphasis() {
        let leaf = TextLeaf::new("x")
            .with_mark("code", true)
            .with_mark("italic", true);
        assert_eq!(html_leaf(&leaf), "<em><code>x</code></em>");
    }

    #[test]
    fn test_html_children_renders_links() {
        let link = ElementNode::new("link")
            .with_prop("href", "https://example.com")
            .with_children(vec![ElementChild::Text(TextLeaf::new("here"))]);
        let children = vec![
            ElementChild::Text(TextLeaf::new("see ")),
            ElementChild::element(link),
        ];
        assert_eq!(
            html_children(&children),
            "see <a href=\"https://example.com\">here</a>"
        );
    }

    #[test]
    fn test_markdown_leaf_wraps_marks() {
        let leaf = TextLeaf::new("both")
            .with_mark("bold", true)
            .with_mark("italic", true);
        assert_eq!(markdown_leaf(&leaf), "***both***");
    }

    #[test]
    fn test_markdown_children_renders_links() {
        let link = ElementNode::new("link")
            .with_prop("href", "https://example.com")
            .with_children(vec![ElementChild::Text(TextLeaf::new("here"))]);
        assert_eq!(
            markdown_children(&[ElementChild::element(link)]),
            "[here](https://example.com)"
        );
    }
}
