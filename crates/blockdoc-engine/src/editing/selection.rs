use serde::{Deserialize, Serialize};

use crate::editing::element::Path;

/// Where a selection change came from. Read-only classification for
/// consumers (floating toolbars and friends); the model itself attaches no
/// behavior to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    Mouse,
    Keyboard,
    #[default]
    Api,
    MouseMove,
}

/// Block-local inline selection while editing text inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSelection {
    pub anchor_path: Path,
    pub anchor_offset: usize,
    pub focus_path: Path,
    pub focus_offset: usize,
}

impl InlineSelection {
    /// Collapsed caret at one point.
    pub fn caret(path: Path, offset: usize) -> Self {
        Self {
            anchor_path: path.clone(),
            anchor_offset: offset,
            focus_path: path,
            focus_offset: offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_path == self.focus_path && self.anchor_offset == self.focus_offset
    }
}

/// Document-level selection state: which block index has the cursor and
/// which block indices are multi-selected.
///
/// `current` and `selected` are mutually informative but not mutually
/// exclusive; a multi-selection may keep a primary block. A non-empty
/// `selected` is the authoritative multi-block-mode signal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub current: Option<usize>,
    pub selected: Option<Vec<usize>>,
    pub source: SelectionSource,
    pub inline: Option<InlineSelection>,
}

impl Selection {
    pub fn set_current(&mut self, index: Option<usize>, source: SelectionSource) {
        self.current = index;
        self.source = source;
        if index.is_none() {
            self.inline = None;
        }
    }

    /// Set the multi-selection. An empty list clears it.
    pub fn set_selected_range(&mut self, indices: Vec<usize>, source: SelectionSource) {
        self.selected = if indices.is_empty() {
            None
        } else {
            Some(indices)
        };
        self.source = source;
    }

    pub fn set_inline(&mut self, inline: InlineSelection, source: SelectionSource) {
        self.inline = Some(inline);
        self.source = source;
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.selected = None;
        self.inline = None;
        self.source = SelectionSource::Api;
    }

    /// Authoritative multi-block-mode signal.
    pub fn is_multi(&self) -> bool {
        self.selected.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// The block indices a block-level command targets: the multi-selection
    /// when active, otherwise the current block.
    pub fn targets(&self) -> Vec<usize> {
        if let Some(selected) = &self.selected
            && !selected.is_empty()
        {
            return selected.clone();
        }
        self.current.into_iter().collect()
    }

    /// Reconcile indices after a block was inserted at `index`.
    pub(crate) fn after_insert(&mut self, index: usize) {
        if let Some(current) = self.current
            && current >= index
        {
            self.current = Some(current + 1);
        }
        if let Some(selected) = &mut self.selected {
            for ix in selected.iter_mut() {
                if *ix >= index {
                    *ix += 1;
                }
            }
        }
    }

    /// Reconcile indices after the block at `index` was removed. The current
    /// block going away nulls `current`; it is never silently repointed at a
    /// neighbor.
    pub(crate) fn after_remove(&mut self, index: usize) {
        match self.current {
            Some(current) if current == index => {
                self.current = None;
                self.inline = None;
            }
            Some(current) if current > index => self.current = Some(current - 1),
            _ => {}
        }
        if let Some(selected) = &mut self.selected {
            selected.retain(|&ix| ix != index);
            for ix in selected.iter_mut() {
                if *ix > index {
                    *ix -= 1;
                }
            }
            if selected.is_empty() {
                self.selected = None;
            }
        }
    }

    /// Reconcile indices after a block moved from `from` to `to`.
    pub(crate) fn after_move(&mut self, from: usize, to: usize) {
        let remap = |ix: usize| -> usize {
            if ix == from {
                to
            } else if from < to && ix > from && ix <= to {
                ix - 1
            } else if to < from && ix >= to && ix < from {
                ix + 1
            } else {
                ix
            }
        };
        if let Some(current) = self.current {
            self.current = Some(remap(current));
        }
        if let Some(selected) = &mut self.selected {
            for ix in selected.iter_mut() {
                *ix = remap(*ix);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ============ Target resolution tests ============

    #[test]
    fn test_targets_prefer_multi_selection() {
        let mut selection = Selection::default();
        selection.set_current(Some(0), SelectionSource::Keyboard);
        selection.set_selected_range(vec![1, 2], SelectionSource::Mouse);

        assert!(selection.is_multi());
        assert_eq!(selection.targets(), vec![1, 2]);
    }

    #[test]
    fn test_targets_fall_back_to_current() {
        let mut selection = Selection::default();
        selection.set_current(Some(3), SelectionSource::Api);
        assert_eq!(selection.targets(), vec![3]);
    }

    #[test]
    fn test_empty_selected_range_clears_multi() {
        let mut selection = Selection::default();
        selection.set_selected_range(vec![1], SelectionSource::Mouse);
        selection.set_selected_range(Vec::new(), SelectionSource::Mouse);
        assert!(!selection.is_multi());
        assert_eq!(selection.selected, None);
    }

    #[test]
    fn test_multi_selection_keeps_primary_block() {
        let mut selection = Selection::default();
        selection.set_current(Some(1), SelectionSource::Mouse);
        selection.set_selected_range(vec![0, 1, 2], SelectionSource::MouseMove);
        assert_eq!(selection.current, Some(1));
    }

    // ============ Index reconciliation tests ============

    #[test]
    fn test_removing_current_block_nulls_current() {
        let mut selection = Selection::default();
        selection.set_current(Some(2), SelectionSource::Keyboard);
        selection.set_inline(
            InlineSelection::caret(Path::new(vec![0]), 3),
            SelectionSource::Keyboard,
        );

        selection.after_remove(2);

        assert_eq!(selection.current, None);
        assert_eq!(selection.inline, None);
    }

    #[test]
    fn test_removing_earlier_block_shifts_current() {
        let mut selection = Selection::default();
        selection.set_current(Some(2), SelectionSource::Keyboard);
        selection.after_remove(0);
        assert_eq!(selection.current, Some(1));
    }

    #[test]
    fn test_remove_drops_index_from_multi_selection() {
        let mut selection = Selection::default();
        selection.set_selected_range(vec![1, 2, 3], SelectionSource::Mouse);
        selection.after_remove(2);
        assert_eq!(selection.selected, Some(vec![1, 2]));
    }

    #[test]
    fn test_insert_shifts_following_indices() {
        let mut selection = Selection::default();
        selection.set_current(Some(1), SelectionSource::Api);
        selection.set_selected_range(vec![0, 1], SelectionSource::Api);

        selection.after_insert(1);

        assert_eq!(selection.current, Some(2));
        assert_eq!(selection.selected, Some(vec![0, 2]));
    }

    #[test]
    fn test_move_remaps_current() {
        let mut selection = Selection::default();
        selection.set_current(Some(0), SelectionSource::Api);
        selection.after_move(0, 2);
        assert_eq!(selection.current, Some(2));

        selection.set_current(Some(1), SelectionSource::Api);
        selection.after_move(2, 0);
        assert_eq!(selection.current, Some(2));
    }

    #[test]
    fn test_caret_is_collapsed() {
        let caret = InlineSelection::caret(Path::new(vec![0, 1]), 5);
        assert!(caret.is_collapsed());
    }
}
