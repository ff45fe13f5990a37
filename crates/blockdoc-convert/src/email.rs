//! Email-HTML export collaborator.
//!
//! Mail clients ignore stylesheets and strip form controls, so everything
//! here is inline styles and plain markup: no classes, no `<details>`, no
//! checkboxes.

use blockdoc_engine::editing::{Align, ElementNode, RenderBlock};
use blockdoc_engine::export::ExportFormat;

use crate::inline::{self, checked};

const BODY_FONT: &str = "font-family: Arial, sans-serif; font-size: 14px; line-height: 1.6";

#[derive(Debug, Default)]
pub struct EmailExport;

impl EmailExport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExportFormat for EmailExport {
    fn serialize_block(&self, block: &RenderBlock) -> Option<String> {
        let mut out = String::new();
        for root in &block.value {
            out.push_str(&render_root(root, block));
        }
        Some(out)
    }
}

fn style_attr(block: &RenderBlock, extra: &str) -> String {
    let mut styles = vec![format!("margin: 0 0 16px {}px", block.depth * 24)];
    if !extra.is_empty() {
        styles.push(extra.to_string());
    }
    match block.align {
        Align::Left => {}
        Align::Center => styles.push("text-align: center".to_string()),
        Align::Right => styles.push("text-align: right".to_string()),
    }
    format!(" style=\"{}\"", styles.join("; "))
}

fn render_root(root: &ElementNode, block: &RenderBlock) -> String {
    match root.kind.as_str() {
        "heading-one" => heading(root, block, "24px"),
        "heading-two" => heading(root, block, "20px"),
        "heading-three" => heading(root, block, "16px"),
        "blockquote" => {
            let style = style_attr(
                block,
                &format!("{BODY_FONT}; border-left: 3px solid #cccccc; padding-left: 12px"),
            );
            format!(
                "<blockquote{style}>{}</blockquote>\n",
                inline::html_children(&root.children)
            )
        }
        "callout" => {
            let style = style_attr(
                block,
                &format!("{BODY_FONT}; background-color: #f5f5f5; padding: 12px"),
            );
            format!("<div{style}>{}</div>\n", inline::html_children(&root.children))
        }
        "code" => {
            let style = style_attr(
                block,
                "font-family: monospace; font-size: 13px; background-color: #f5f5f5; padding: 12px",
            );
            format!(
                "<pre{style}>{}</pre>\n",
                html_escape::encode_text(&root.plain_text())
            )
        }
        "divider" => {
            let style = style_attr(block, "border: none; border-top: 1px solid #cccccc");
            format!("<hr{style} />\n")
        }
        "bulleted-list" | "todo-list" => render_list(root, block, "ul"),
        "numbered-list" => render_list(root, block, "ol"),
        "accordion-list" => render_accordion(root, block),
        "table" => render_table(root, block),
        _ => {
            let style = style_attr(block, BODY_FONT);
            format!("<p{style}>{}</p>\n", inline::html_children(&root.children))
        }
    }
}

fn heading(root: &ElementNode, block: &RenderBlock, size: &str) -> String {
    let style = style_attr(
        block,
        &format!("font-family: Arial, sans-serif; font-size: {size}; font-weight: bold"),
    );
    format!("<p{style}>{}</p>\n", inline::html_children(&root.children))
}

fn render_list(root: &ElementNode, block: &RenderBlock, list_tag: &str) -> String {
    let todo = root.kind == "todo-list";
    let style = style_attr(block, &format!("{BODY_FONT}; padding-left: 24px"));
    let mut out = format!("<{list_tag}{style}>\n");
    for child in &root.children {
        let Some(item) = child.as_element() else {
            continue;
        };
        let prefix = if todo {
            if checked(item) { "[x] " } else { "[ ] " }
        } else {
            ""
        };
        out.push_str(&format!(
            "<li>{prefix}{}</li>\n",
            inline::html_children(&item.children)
        ));
    }
    out.push_str(&format!("</{list_tag}>\n"));
    out
}

fn render_accordion(root: &ElementNode, block: &RenderBlock) -> String {
    let heading_style = style_attr(block, &format!("{BODY_FONT}; font-weight: bold"));
    let body_style = style_attr(block, BODY_FONT);
    let mut out = String::new();
    for child in &root.children {
        let Some(item) = child.as_element() else {
            continue;
        };
        for slot in &item.children {
            let Some(element) = slot.as_element() else {
                continue;
            };
            let body = inline::html_children(&element.children);
            if element.kind == "accordion-list-item-heading" {
                out.push_str(&format!("<p{heading_style}>{body}</p>\n"));
            } else if !body.is_empty() {
                out.push_str(&format!("<p{body_style}>{body}</p>\n"));
            }
        }
    }
    out
}

fn render_table(root: &ElementNode, block: &RenderBlock) -> String {
    let style = style_attr(block, &format!("{BODY_FONT}; border-collapse: collapse"));
    let mut out = format!("<table{style}>\n");
    for child in &root.children {
        let Some(row) = child.as_element() else {
            continue;
        };
        out.push_str("<tr>");
        for slot in &row.children {
            if let Some(cell) = slot.as_element() {
                out.push_str(&format!(
                    "<td style=\"border: 1px solid #dddddd; padding: 6px\">{}</td>",
                    inline::html_children(&cell.children)
                ));
            }
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    out
}
