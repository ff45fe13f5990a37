//! Markdown export collaborator.

use blockdoc_engine::editing::{ElementNode, PropValue, RenderBlock};
use blockdoc_engine::export::ExportFormat;

use crate::inline::{self, checked};

/// Serializes each block to CommonMark. Depth renders as two spaces of
/// indentation per level; alignment has no Markdown form and is dropped.
#[derive(Debug, Default)]
pub struct MarkdownExport;

impl MarkdownExport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExportFormat for MarkdownExport {
    fn serialize_block(&self, block: &RenderBlock) -> Option<String> {
        let indent = "  ".repeat(block.depth);
        let mut out = String::new();
        for root in &block.value {
            out.push_str(&render_root(root, &indent));
        }
        Some(out)
    }
}

fn render_root(root: &ElementNode, indent: &str) -> String {
    match root.kind.as_str() {
        "heading-one" => format!("{indent}# {}\n\n", inline::markdown_children(&root.children)),
        "heading-two" => format!("{indent}## {}\n\n", inline::markdown_children(&root.children)),
        "heading-three" => {
            format!("{indent}### {}\n\n", inline::markdown_children(&root.children))
        }
        "blockquote" | "callout" => render_quote(root, indent),
        "code" => render_code(root, indent),
        "divider" => format!("{indent}---\n\n"),
        "bulleted-list" | "numbered-list" | "todo-list" => render_list(root, indent),
        "accordion-list" => render_accordion(root, indent),
        "table" => render_table(root, indent),
        _ => format!("{indent}{}\n\n", inline::markdown_children(&root.children)),
    }
}

fn render_quote(root: &ElementNode, indent: &str) -> String {
    let body = inline::markdown_children(&root.children);
    let mut out = String::new();
    for line in body.split('\n') {
        out.push_str(&format!("{indent}> {line}\n"));
    }
    out.push('\n');
    out
}

fn render_code(root: &ElementNode, indent: &str) -> String {
    let language = match root.props.get("language") {
        Some(PropValue::Str(language)) => language.as_str(),
        _ => "",
    };
    format!("{indent}```{language}\n{}\n{indent}```\n\n", root.plain_text())
}

fn render_list(root: &ElementNode, indent: &str) -> String {
    let ordered = root.kind == "numbered-list";
    let todo = root.kind == "todo-list";
    let mut out = String::new();
    let mut position = 1;
    for child in &root.children {
        let Some(item) = child.as_element() else {
            continue;
        };
        let text = inline::markdown_children(&item.children);
        if todo {
            let state = if checked(item) { 'x' } else { ' ' };
            out.push_str(&format!("{indent}- [{state}] {text}\n"));
        } else if ordered {
            out.push_str(&format!("{indent}{position}. {text}\n"));
            position += 1;
        } else {
            out.push_str(&format!("{indent}- {text}\n"));
        }
    }
    out.push('\n');
    out
}

// Markdown has no disclosure widget; items render as a bold heading line
// followed by their content.
fn render_accordion(root: &ElementNode, indent: &str) -> String {
    let mut out = String::new();
    for child in &root.children {
        let Some(item) = child.as_element() else {
            continue;
        };
        for slot in &item.children {
            let Some(element) = slot.as_element() else {
                continue;
            };
            let text = inline::markdown_children(&element.children);
            if element.kind == "accordion-list-item-heading" {
                out.push_str(&format!("{indent}**{text}**\n\n"));
            } else if !text.is_empty() {
                out.push_str(&format!("{indent}{text}\n\n"));
            }
        }
    }
    out
}

fn render_table(root: &ElementNode, indent: &str) -> String {
    let rows: Vec<Vec<String>> = root
        .children
        .iter()
        .filter_map(|child| child.as_element())
        .map(|row| {
            row.children
                .iter()
                .filter_map(|slot| slot.as_element())
                .map(|cell| inline::markdown_children(&cell.children))
                .collect()
        })
        .collect();
    let Some(header) = rows.first() else {
        return String::new();
    };

    let mut out = format!("{indent}| {} |\n", header.join(" | "));
    out.push_str(&format!(
        "{indent}|{}\n",
        " --- |".repeat(header.len())
    ));
    for row in &rows[1..] {
        out.push_str(&format!("{indent}| {} |\n", row.join(" | ")));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdoc_engine::editing::{Align, ElementChild, NodeKind, TextLeaf};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
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

    #[rstest]
    #[case::h1("heading-one", "# Title\n\n")]
    #[case::h2("heading-two", "## Title\n\n")]
    #[case::h3("heading-three", "### Title\n\n")]
    fn test_heading_levels(#[case] kind: &str, #[case] expected: &str) {
        let root = ElementNode::root(kind, NodeKind::Block)
            .with_children(vec![ElementChild::Text(TextLeaf::new("Title"))]);
        let md = MarkdownExport.serialize_block(&block("Heading", root)).unwrap();
        assert_eq!(md, expected);
    }

    #[test]
    fn test_depth_becomes_indentation() {
        let root = ElementNode::root("paragraph", NodeKind::Block)
            .with_children(vec![ElementChild::Text(TextLeaf::new("nested"))]);
        let mut render = block("Paragraph", root);
        render.depth = 2;

        let md = MarkdownExport.serialize_block(&render).unwrap();
        assert_eq!(md, "    nested\n\n");
    }

    #[test]
    fn test_quote_prefixes_every_line() {
        let root = ElementNode::root("blockquote", NodeKind::Block)
            .with_children(vec![ElementChild::Text(TextLeaf::new("one\ntwo"))]);
        let md = MarkdownExport.serialize_block(&block("Blockquote", root)).unwrap();
        assert_eq!(md, "> one\n> two\n\n");
    }

    #[test]
    fn test_numbered_list_counts_items() {
        let item = |text: &str| {
            ElementChild::element(
                ElementNode::new("numbered-list-item")
                    .with_children(vec![ElementChild::Text(TextLeaf::new(text))]),
            )
        };
        let root = ElementNode::root("numbered-list", NodeKind::Block)
            .with_children(vec![item("a"), item("b")]);
        let md = MarkdownExport
            .serialize_block(&block("NumberedList", root))
            .unwrap();
        assert_eq!(md, "1. a\n2. b\n\n");
    }

    #[test]
    fn test_todo_list_renders_check_state() {
        let done = ElementNode::new("todo-list-item")
            .with_prop("checked", true)
            .with_children(vec![ElementChild::Text(TextLeaf::new("done"))]);
        let root = ElementNode::root("todo-list", NodeKind::Block)
            .with_children(vec![ElementChild::element(done)]);
        let md = MarkdownExport.serialize_block(&block("TodoList", root)).unwrap();
        assert_eq!(md, "- [x] done\n\n");
    }

    #[test]
    fn test_code_fence_carries_language() {
        let root = ElementNode::root("code", NodeKind::Block)
            .with_prop("language", "rust")
            .with_children(vec![ElementChild::Text(TextLeaf::new("fn main() {}"))]);
        let md = MarkdownExport.serialize_block(&block("Code", root)).unwrap();
        assert_eq!(md, "```rust\nfn main() {}\n```\n\n");
    }

    #[test]
    fn test_table_renders_header_separator() {
        let cell = |text: &str| {
            ElementChild::element(
                ElementNode::new("table-cell")
                    .with_children(vec![ElementChild::Text(TextLeaf::new(text))]),
            )
        };
        let row = |cells: Vec<ElementChild>| {
            ElementChild::element(ElementNode::new("table-row").with_children(cells))
        };
        let root = ElementNode::root("table", NodeKind::Block).with_children(vec![
            row(vec![cell("a"), cell("b")]),
            row(vec![cell("c"), cell("d")]),
        ]);
        let md = MarkdownExport.serialize_block(&block("Table", root)).unwrap();
        assert_eq!(md, "| a | b |\n| --- | --- |\n| c | d |\n\n");
    }
}
