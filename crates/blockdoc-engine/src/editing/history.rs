use std::sync::Arc;

use uuid::Uuid;

use crate::editing::element::ElementNode;
use crate::editing::selection::Selection;
use crate::editing::store::{Block, BlockMeta, BlockStore};
use crate::error::EngineError;

/// Whether an operation came from local user input or a remote collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

impl Origin {
    pub fn is_local(self) -> bool {
        matches!(self, Origin::Local)
    }
}

/// A reversible document-level mutation, the unit a [`HistoryEntry`] is made
/// of. Content merges and splits are captured as whole-value swaps, which
/// keeps every op trivially invertible.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveOp {
    InsertNode { index: usize, block: Block },
    RemoveNode { index: usize, block: Block },
    SetNodeValue {
        id: Uuid,
        before: Vec<Arc<ElementNode>>,
        after: Vec<Arc<ElementNode>>,
    },
    SetNodeProps {
        id: Uuid,
        before: BlockMeta,
        after: BlockMeta,
    },
    SetNodeKind {
        id: Uuid,
        before: String,
        after: String,
    },
    MoveNode { id: Uuid, from: usize, to: usize },
}

impl PrimitiveOp {
    pub(crate) fn invert(&self) -> PrimitiveOp {
        match self {
            PrimitiveOp::InsertNode { index, block } => PrimitiveOp::RemoveNode {
                index: *index,
                block: block.clone(),
            },
            PrimitiveOp::RemoveNode { index, block } => PrimitiveOp::InsertNode {
                index: *index,
                block: block.clone(),
            },
            PrimitiveOp::SetNodeValue { id, before, after } => PrimitiveOp::SetNodeValue {
                id: *id,
                before: after.clone(),
                after: before.clone(),
            },
            PrimitiveOp::SetNodeProps { id, before, after } => PrimitiveOp::SetNodeProps {
                id: *id,
                before: *after,
                after: *before,
            },
            PrimitiveOp::SetNodeKind { id, before, after } => PrimitiveOp::SetNodeKind {
                id: *id,
                before: after.clone(),
                after: before.clone(),
            },
            PrimitiveOp::MoveNode { id, from, to } => PrimitiveOp::MoveNode {
                id: *id,
                from: *to,
                to: *from,
            },
        }
    }

    /// Replay this op against a store. Undo/redo applies inverted ops to a
    /// working copy, so a failure here never corrupts the live document.
    pub(crate) fn apply(&self, store: &mut BlockStore) -> Result<(), EngineError> {
        match self {
            PrimitiveOp::InsertNode { index, block } => {
                store.insert(block.clone(), *index);
            }
            PrimitiveOp::RemoveNode { block, .. } => {
                store.remove(block.id)?;
            }
            PrimitiveOp::SetNodeValue { id, after, .. } => {
                store.replace_value(*id, after.clone())?;
            }
            PrimitiveOp::SetNodeProps { id, after, .. } => {
                store.set_meta_raw(*id, *after)?;
            }
            PrimitiveOp::SetNodeKind { id, after, .. } => {
                store.set_kind_raw(*id, after.clone())?;
            }
            PrimitiveOp::MoveNode { id, to, .. } => {
                store.move_to(*id, *to)?;
            }
        }
        Ok(())
    }

    /// Block ids this op touches, for change reporting.
    pub(crate) fn touched_id(&self) -> Uuid {
        match self {
            PrimitiveOp::InsertNode { block, .. } | PrimitiveOp::RemoveNode { block, .. } => {
                block.id
            }
            PrimitiveOp::SetNodeValue { id, .. }
            | PrimitiveOp::SetNodeProps { id, .. }
            | PrimitiveOp::SetNodeKind { id, .. }
            | PrimitiveOp::MoveNode { id, .. } => *id,
        }
    }
}

/// One committed unit of work: the primitive ops of a command or batch plus
/// the selection on both sides, stamped in commit order.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub ops: Vec<PrimitiveOp>,
    pub selection_before: Selection,
    pub selection_after: Selection,
    /// Logical timestamp: strictly increasing per document instance.
    pub stamp: u64,
    pub origin: Origin,
}

/// Undo/redo stacks. Entries form a strictly ordered stack per document
/// instance; remote-origin work is applied to the store but never recorded
/// here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    next_stamp: u64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed local entry. A new edit invalidates the redo
    /// branch. Remote-origin entries are dropped.
    pub(crate) fn record(&mut self, mut entry: HistoryEntry) {
        if !entry.origin.is_local() {
            return;
        }
        entry.stamp = self.next_stamp;
        self.next_stamp += 1;
        self.redo.clear();
        self.undo.push(entry);
    }

    pub(crate) fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo.pop()
    }

    pub(crate) fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
    }

    pub(crate) fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push(entry);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::element::{ElementChild, NodeKind, TextLeaf};

    fn paragraph_block(text: &str) -> Block {
        Block::new(
            "Paragraph",
            vec![Arc::new(
                ElementNode::root("paragraph", NodeKind::Block)
                    .with_children(vec![ElementChild::Text(TextLeaf::new(text))]),
            )],
        )
    }

    fn entry(origin: Origin) -> HistoryEntry {
        HistoryEntry {
            ops: vec![PrimitiveOp::InsertNode {
                index: 0,
                block: paragraph_block("x"),
            }],
            selection_before: Selection::default(),
            selection_after: Selection::default(),
            stamp: 0,
            origin,
        }
    }

    // ============ Recording tests ============

    #[test]
    fn test_local_entries_are_recorded_with_increasing_stamps() {
        let mut history = History::new();
        history.record(entry(Origin::Local));
        history.record(entry(Origin::Local));

        let second = history.pop_undo().unwrap();
        let first = history.pop_undo().unwrap();
        assert!(second.stamp > first.stamp);
    }

    #[test]
    fn test_remote_entries_are_not_recorded() {
        let mut history = History::new();
        history.record(entry(Origin::Remote));
        assert!(!history.can_undo());
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut history = History::new();
        history.record(entry(Origin::Local));
        let undone = history.pop_undo().unwrap();
        history.push_redo(undone);
        assert!(history.can_redo());

        history.record(entry(Origin::Local));
        assert!(!history.can_redo());
    }

    // ============ Inversion tests ============

    #[test]
    fn test_invert_is_an_involution() {
        let block = paragraph_block("a");
        let ops = vec![
            PrimitiveOp::InsertNode {
                index: 1,
                block: block.clone(),
            },
            PrimitiveOp::MoveNode {
                id: block.id,
                from: 0,
                to: 2,
            },
            PrimitiveOp::SetNodeKind {
                id: block.id,
                before: "Paragraph".to_string(),
                after: "HeadingOne".to_string(),
            },
        ];
        for op in ops {
            assert_eq!(op.invert().invert(), op);
        }
    }

    #[test]
    fn test_apply_inverted_insert_removes_block() {
        let mut store = BlockStore::new();
        let block = paragraph_block("a");
        let op = PrimitiveOp::InsertNode {
            index: 0,
            block: block.clone(),
        };
        op.apply(&mut store).unwrap();
        assert_eq!(store.len(), 1);

        op.invert().apply(&mut store).unwrap();
        assert!(store.is_empty());
    }
}
