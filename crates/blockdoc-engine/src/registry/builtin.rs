//! Built-in block type palette.

use anyhow::{bail, ensure};

use crate::editing::element::{ElementChild, ElementNode, NodeKind};
use crate::editing::store::Block;

use super::{BlockDescriptor, Rule};

pub(super) fn all() -> Vec<BlockDescriptor> {
    vec![
        BlockDescriptor::new("Paragraph", "paragraph", NodeKind::Block),
        BlockDescriptor::new("HeadingOne", "heading-one", NodeKind::Block),
        BlockDescriptor::new("HeadingTwo", "heading-two", NodeKind::Block),
        BlockDescriptor::new("HeadingThree", "heading-three", NodeKind::Block),
        BlockDescriptor::new("Blockquote", "blockquote", NodeKind::Block),
        BlockDescriptor::new("Callout", "callout", NodeKind::Block).with_rule(
            Rule::SingletonRoot {
                kind: "callout".to_string(),
            },
        ),
        BlockDescriptor::new("Code", "code", NodeKind::Block),
        BlockDescriptor::new("Divider", "divider", NodeKind::Void),
        list_descriptor("BulletedList", "bulleted-list", bulleted_list_scaffold),
        list_descriptor("NumberedList", "numbered-list", numbered_list_scaffold),
        list_descriptor("TodoList", "todo-list", todo_list_scaffold),
        BlockDescriptor::new("Accordion", "accordion-list", NodeKind::Block)
            .with_rule(Rule::MergeAdjacent {
                kind: "accordion-list".to_string(),
            })
            .with_rule(Rule::DropEmptyEphemeral {
                kind: "accordion-list-item".to_string(),
            })
            .with_scaffold(accordion_scaffold),
        BlockDescriptor::new("Table", "table", NodeKind::Block)
            .with_validator(validate_table)
            .with_scaffold(table_scaffold),
    ]
}

// Adjacent list roots merge into one list; the items themselves stay
// separate siblings.
fn list_descriptor(kind: &str, root: &str, scaffold: fn() -> ElementNode) -> BlockDescriptor {
    BlockDescriptor::new(kind, root, NodeKind::Block)
        .with_rule(Rule::MergeAdjacent {
            kind: root.to_string(),
        })
        .with_scaffold(scaffold)
}

fn list_scaffold(root: &str, item: &str) -> ElementNode {
    ElementNode::root(root, NodeKind::Block)
        .with_children(vec![ElementChild::element(ElementNode::new(item))])
}

fn bulleted_list_scaffold() -> ElementNode {
    list_scaffold("bulleted-list", "bulleted-list-item")
}

fn numbered_list_scaffold() -> ElementNode {
    list_scaffold("numbered-list", "numbered-list-item")
}

fn todo_list_scaffold() -> ElementNode {
    list_scaffold("todo-list", "todo-list-item")
}

fn accordion_scaffold() -> ElementNode {
    let heading = ElementNode::new("accordion-list-item-heading");
    let content = ElementNode::new("accordion-list-item-content");
    let item = ElementNode::new("accordion-list-item").with_children(vec![
        ElementChild::element(heading),
        ElementChild::element(content),
    ]);
    ElementNode::root("accordion-list", NodeKind::Block)
        .with_children(vec![ElementChild::element(item)])
}

fn table_scaffold() -> ElementNode {
    let cell = ElementNode::new("table-cell");
    let row = ElementNode::new("table-row").with_children(vec![ElementChild::element(cell)]);
    ElementNode::root("table", NodeKind::Block)
        .with_children(vec![ElementChild::element(row)])
}

fn validate_table(block: &Block) -> anyhow::Result<()> {
    for root in &block.value {
        if root.kind != "table" {
            continue;
        }
        let mut width = None;
        ensure!(!root.children.is_empty(), "a table needs at least one row");
        for child in &root.children {
            let Some(row) = child.as_element() else {
                bail!("tables hold rows, not loose text");
            };
            if row.kind != "table-row" {
                bail!("unexpected `{}` inside a table", row.kind);
            }
            let cells = row
                .children
                .iter()
                .filter(|cell| {
                    cell.as_element()
                        .is_some_and(|element| element.kind == "table-cell")
                })
                .count();
            ensure!(cells >= 1, "a table row needs at least one cell");
            match width {
                None => width = Some(cells),
                Some(expected) => {
                    ensure!(
                        cells == expected,
                        "ragged table: row has {cells} cells, expected {expected}"
                    );
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::element::TextLeaf;
    use std::sync::Arc;

    fn table_block(rows: Vec<Vec<&str>>) -> Block {
        let rows = rows
            .into_iter()
            .map(|cells| {
                let cells = cells
                    .into_iter()
                    .map(|text| {
                        ElementChild::element(ElementNode::new("table-cell").with_children(vec![
                            ElementChild::Text(TextLeaf::new(text)),
                        ]))
                    })
                    .collect();
                ElementChild::element(ElementNode::new("table-row").with_children(cells))
            })
            .collect();
        Block::new(
            "Table",
            vec![Arc::new(
                ElementNode::root("table", NodeKind::Block).with_children(rows),
            )],
        )
    }

    #[test]
    fn test_uniform_table_validates() {
        let block = table_block(vec![vec!["a", "b"], vec!["c", "d"]]);
        assert!(validate_table(&block).is_ok());
    }

    #[test]
    fn test_ragged_table_is_rejected() {
        let block = table_block(vec![vec!["a", "b"], vec!["c"]]);
        assert!(validate_table(&block).is_err());
    }

    #[test]
    fn test_table_without_rows_is_rejected() {
        let block = Block::new(
            "Table",
            vec![Arc::new(
                ElementNode::root("table", NodeKind::Block).with_children(Vec::new()),
            )],
        );
        assert!(validate_table(&block).is_err());
    }
}
