//! Plain-text export collaborator.

use blockdoc_engine::editing::{ElementNode, RenderBlock};
use blockdoc_engine::export::ExportFormat;

use crate::inline::checked;

/// Serializes each block to plain text, one line per paragraph-like unit.
/// Depth renders as two spaces of indentation per level.
#[derive(Debug, Default)]
pub struct TextExport;

impl TextExport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExportFormat for TextExport {
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
        "divider" => format!("{indent}---\n"),
        "bulleted-list" | "numbered-list" | "todo-list" => render_list(root, indent),
        "accordion-list" => render_accordion(root, indent),
        "table" => render_table(root, indent),
        _ => format!("{indent}{}\n", root.plain_text()),
    }
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
        let text = item.plain_text();
        if todo {
            let state = if checked(item) { "[x]" } else { "[ ]" };
            out.push_str(&format!("{indent}{state} {text}\n"));
        } else if ordered {
            out.push_str(&format!("{indent}{position}. {text}\n"));
            position += 1;
        } else {
            out.push_str(&format!("{indent}- {text}\n"));
        }
    }
    out
}

fn render_accordion(root: &ElementNode, indent: &str) -> String {
    let mut out = String::new();
    for child in &root.children {
        let Some(item) = child.as_element() else {
            continue;
        };
        for slot in &item.children {
            if let Some(element) = slot.as_element() {
                let text = element.plain_text();
                if !text.is_empty() {
                    out.push_str(&format!("{indent}{text}\n"));
                }
            }
        }
    }
    out
}

fn render_table(root: &ElementNode, indent: &str) -> String {
    let mut out = String::new();
    for child in &root.children {
        let Some(row) = child.as_element() else {
            continue;
        };
        let cells: Vec<String> = row
            .children
            .iter()
            .filter_map(|slot| slot.as_element())
            .map(|cell| cell.plain_text())
            .collect();
        out.push_str(&format!("{indent}{}\n", cells.join("\t")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdoc_engine::editing::{Align, ElementChild, NodeKind, TextLeaf};
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
    fn test_paragraph_drops_marks() {
        let root = ElementNode::root("paragraph", NodeKind::Block).with_children(vec![
            ElementChild::Text(TextLeaf::new("plain ")),
            ElementChild::Text(TextLeaf::new("bold").with_mark("bold", true)),
        ]);
        let text = TextExport.serialize_block(&block("Paragraph", root)).unwrap();
        assert_eq!(text, "plain bold\n");
    }

    #[test]
    fn test_list_items_get_their_own_lines() {
        let item = |text: &str| {
            ElementChild::element(
                ElementNode::new("bulleted-list-item")
                    .with_children(vec![ElementChild::Text(TextLeaf::new(text))]),
            )
        };
        let root = ElementNode::root("bulleted-list", NodeKind::Block)
            .with_children(vec![item("a"), item("b")]);
        let text = TextExport
            .serialize_block(&block("BulletedList", root))
            .unwrap();
        assert_eq!(text, "- a\n- b\n");
    }

    #[test]
    fn test_table_cells_join_with_tabs() {
        let cell = |text: &str| {
            ElementChild::element(
                ElementNode::new("table-cell")
                    .with_children(vec![ElementChild::Text(TextLeaf::new(text))]),
            )
        };
        let row = ElementNode::new("table-row").with_children(vec![cell("a"), cell("b")]);
        let root = ElementNode::root("table", NodeKind::Block)
            .with_children(vec![ElementChild::element(row)]);
        let text = TextExport.serialize_block(&block("Table", root)).unwrap();
        assert_eq!(text, "a\tb\n");
    }

    #[test]
    fn test_depth_indents_output() {
        let root = ElementNode::root("paragraph", NodeKind::Block)
            .with_children(vec![ElementChild::Text(TextLeaf::new("deep"))]);
        let mut render = block("Paragraph", root);
        render.depth = 1;
        let text = TextExport.serialize_block(&render).unwrap();
        assert_eq!(text, "  deep\n");
    }
}
