//! HTML export collaborator.

use blockdoc_engine::editing::{Align, ElementNode, PropValue, RenderBlock};
use blockdoc_engine::export::ExportFormat;

use crate::inline::{self, checked};

/// Serializes each block to semantic HTML. Depth renders as a left margin,
/// alignment as `text-align`.
#[derive(Debug, Default)]
pub struct HtmlExport;

impl HtmlExport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExportFormat for HtmlExport {
    fn serialize_block(&self, block: &RenderBlock) -> Option<String> {
        let style = style_attr(block);
        let mut out = String::new();
        for root in &block.value {
            out.push_str(&render_root(root, &style));
        }
        Some(out)
    }
}

fn style_attr(block: &RenderBlock) -> String {
    let mut styles = Vec::new();
    if block.depth > 0 {
        styles.push(format!("margin-left: {}px", block.depth * 24));
    }
    match block.align {
        Align::Left => {}
        Align::Center => styles.push("text-align: center".to_string()),
        Align::Right => styles.push("text-align: right".to_string()),
    }
    if styles.is_empty() {
        String::new()
    } else {
        format!(" style=\"{}\"", styles.join("; "))
    }
}

fn render_root(root: &ElementNode, style: &str) -> String {
    match root.kind.as_str() {
        "paragraph" => tag("p", style, &inline::html_children(&root.children)),
        "heading-one" => tag("h1", style, &inline::html_children(&root.children)),
        "heading-two" => tag("h2", style, &inline::html_children(&root.children)),
        "heading-three" => tag("h3", style, &inline::html_children(&root.children)),
        "blockquote" => tag("blockquote", style, &inline::html_children(&root.children)),
        "callout" => tag("aside", style, &inline::html_children(&root.children)),
        "code" => render_code(root, style),
        "divider" => "<hr />\n".to_string(),
        "bulleted-list" | "todo-list" => render_list(root, "ul", style),
        "numbered-list" => render_list(root, "ol", style),
        "accordion-list" => render_accordion(root, style),
        "table" => render_table(root, style),
        _ => tag("div", style, &inline::html_children(&root.children)),
    }
}

fn tag(name: &str, style: &str, body: &str) -> String {
    format!("<{name}{style}>{body}</{name}>\n")
}

fn render_code(root: &ElementNode, style: &str) -> String {
    let class = match root.props.get("language") {
        Some(PropValue::Str(language)) => format!(
            " class=\"language-{}\"",
            html_escape::encode_double_quoted_attribute(language)
        ),
        _ => String::new(),
    };
    format!(
        "<pre{style}><code{class}>{}</code></pre>\n",
        html_escape::encode_text(&root.plain_text())
    )
}

fn render_list(root: &ElementNode, list_tag: &str, style: &str) -> String {
    let todo = root.kind == "todo-list";
    let mut out = format!("<{list_tag}{style}>\n");
    for child in &root.children {
        let Some(item) = child.as_element() else {
            continue;
        };
        let checkbox = if todo {
            if checked(item) {
                "<input type=\"checkbox\" checked disabled /> "
            } else {
                "<input type=\"checkbox\" disabled /> "
            }
        } else {
            ""
        };
        out.push_str(&format!(
            "<li>{checkbox}{}</li>\n",
            inline::html_children(&item.children)
        ));
    }
    out.push_str(&format!("</{list_tag}>\n"));
    out
}

fn render_accordion(root: &ElementNode, style: &str) -> String {
    let mut out = String::new();
    for child in &root.children {
        let Some(item) = child.as_element() else {
            continue;
        };
        let mut summary = String::new();
        let mut body = String::new();
        for slot in &item.children {
            match slot.as_element() {
                Some(element) if element.kind == "accordion-list-item-heading" => {
                    summary.push_str(&inline::html_children(&element.children));
                }
                Some(element) => body.push_str(&inline::html_children(&element.children)),
                None => body.push_str(&inline::html_children(std::slice::from_ref(slot))),
            }
        }
        out.push_str(&format!(
            "<details{style}><summary>{summary}</summary><div>{body}</div></details>\n"
        ));
    }
    out
}

fn render_table(root: &ElementNode, style: &str) -> String {
    let mut out = format!("<table{style}>\n");
    for child in &root.children {
        let Some(row) = child.as_element() else {
            continue;
        };
        out.push_str("<tr>");
        for slot in &row.children {
            if let Some(cell) = slot.as_element() {
                out.push_str(&format!("<td>{}</td>", inline::html_children(&cell.children)));
            }
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdoc_engine::editing::{ElementChild, NodeKind, TextLeaf};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use uuid::Uuid;

    fn block(kind: &str, root: ElementNode) -> RenderBlock {
        RenderBlock {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            order: 0,
            depth: 0,
            align: Align::Left,
            value: vec![Arc::new(root)],
        }
    }

    #[test]
    fn test_paragraph_renders_inline_marks() {
        let root = ElementNode::root("paragraph", NodeKind::Block).with_children(vec![
            ElementChild::Text(TextLeaf::new("plain ")),
            ElementChild::Text(TextLeaf::new("bold").with_mark("bold", true)),
        ]);
        let html = HtmlExport.serialize_block(&block("Paragraph", root)).unwrap();
        assert_eq!(html, "<p>plain <strong>bold</strong></p>\n");
    }

    #[test]
    fn test_alignment_and_depth_land_in_the_style_attribute() {
        let root = ElementNode::root("paragraph", NodeKind::Block)
            .with_children(vec![ElementChild::Text(TextLeaf::new("x"))]);
        let mut render = block("Paragraph", root);
        render.depth = 2;
        render.align = Align::Center;

        let html = HtmlExport.serialize_block(&render).unwrap();
        assert_eq!(
            html,
            "<p style=\"margin-left: 48px; text-align: center\">x</p>\n"
        );
    }

    #[test]
    fn test_code_block_carries_its_language_class() {
        let root = ElementNode::root("code", NodeKind::Block)
            .with_prop("language", "rust")
            .with_children(vec![ElementChild::Text(TextLeaf::new("fn main() {}"))]);
        let html = HtmlExport.serialize_block(&block("Code", root)).unwrap();
        assert_eq!(
            html,
            "<pre><code class=\"language-rust\">fn main() {}</code></pre>\n"
        );
    }

    #[test]
    fn test_todo_list_renders_checkbox_state() {
        let done = ElementNode::new("todo-list-item")
            .with_prop("checked", true)
            .with_children(vec![ElementChild::Text(TextLeaf::new("done"))]);
        let open = ElementNode::new("todo-list-item")
            .with_prop("checked", false)
            .with_children(vec![ElementChild::Text(TextLeaf::new("open"))]);
        let root = ElementNode::root("todo-list", NodeKind::Block).with_children(vec![
            ElementChild::element(done),
            ElementChild::element(open),
        ]);

        let html = HtmlExport.serialize_block(&block("TodoList", root)).unwrap();
        assert!(html.contains("<input type=\"checkbox\" checked disabled /> done"));
        assert!(html.contains("<input type=\"checkbox\" disabled /> open"));
    }

    #[test]
    fn test_accordion_renders_details_per_item() {
        let heading = ElementNode::new("accordion-list-item-heading")
            .with_children(vec![ElementChild::Text(TextLeaf::new("Q"))]);
        let content = ElementNode::new("accordion-list-item-content")
            .with_children(vec![ElementChild::Text(TextLeaf::new("A"))]);
        let item = ElementNode::new("accordion-list-item").with_children(vec![
            ElementChild::element(heading),
            ElementChild::element(content),
        ]);
        let root = ElementNode::root("accordion-list", NodeKind::Block)
            .with_children(vec![ElementChild::element(item)]);

        let html = HtmlExport
            .serialize_block(&block("Accordion", root))
            .unwrap();
        assert_eq!(
            html,
            "<details><summary>Q</summary><div>A</div></details>\n"
        );
    }

    #[test]
    fn test_divider_is_a_horizontal_rule() {
        let root = ElementNode::root("divider", NodeKind::Void);
        let html = HtmlExport.serialize_block(&block("Divider", root)).unwrap();
        assert_eq!(html, "<hr />\n");
    }
}
