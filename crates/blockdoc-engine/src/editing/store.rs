use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editing::element::{self, ElementNode};
use crate::error::EngineError;

/// Horizontal alignment of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Per-block metadata owned by the store.
///
/// `order` is a dense, zero-based positional index across the whole document,
/// recomputed after every structural mutation. `depth` may exceed the
/// predecessor's depth by at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockMeta {
    pub order: usize,
    pub depth: usize,
    #[serde(default)]
    pub align: Align,
}

/// Caller-facing meta update; `order` is not patchable, the store owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetaPatch {
    pub depth: Option<usize>,
    pub align: Option<Align>,
}

/// A top-level addressable unit of document content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Vec<Arc<ElementNode>>,
    pub meta: BlockMeta,
}

impl Block {
    pub fn new(kind: impl Into<String>, value: Vec<Arc<ElementNode>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            value,
            meta: BlockMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: BlockMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn plain_text(&self) -> String {
        element::plain_text(&self.value)
    }

    /// True when every leaf under the block is empty text.
    pub fn is_blank(&self) -> bool {
        self.value.iter().all(|root| root.is_blank())
    }
}

/// The ordered collection of blocks forming the document.
///
/// Index-based operations renumber `order` across the whole store afterward;
/// documents are editing-scale, so the O(n) rewrite is preferred over
/// incremental order maintenance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStore {
    blocks: Vec<Block>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-validated blocks, keeping their sequence.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut store = Self { blocks };
        store.renumber();
        store
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, id: Uuid) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn get_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn index_of(&self, id: Uuid) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }

    /// Insert a block at `at`, clamped to `[0, len]` (permissive insertion
    /// policy). Returns the block's id.
    pub fn insert(&mut self, block: Block, at: usize) -> Uuid {
        let id = block.id;
        let at = at.min(self.blocks.len());
        self.blocks.insert(at, block);
        self.renumber();
        id
    }

    /// Remove a block by id, returning its former index and the block itself.
    pub fn remove(&mut self, id: Uuid) -> Result<(usize, Block), EngineError> {
        let index = self
            .index_of(id)
            .ok_or(EngineError::BlockNotFound { id })?;
        let block = self.blocks.remove(index);
        self.renumber();
        Ok((index, block))
    }

    /// Move a block to `to` (clamped). Returns the resolved `(from, to)`.
    pub fn move_to(&mut self, id: Uuid, to: usize) -> Result<(usize, usize), EngineError> {
        let from = self
            .index_of(id)
            .ok_or(EngineError::BlockNotFound { id })?;
        let block = self.blocks.remove(from);
        let to = to.min(self.blocks.len());
        self.blocks.insert(to, block);
        self.renumber();
        Ok((from, to))
    }

    /// Deep-copy a block with fresh ids for the block and every nested
    /// element, inserting the copy immediately after the source. Returns the
    /// copy's index and a clone of it.
    pub fn duplicate(&mut self, id: Uuid) -> Result<(usize, Block), EngineError> {
        let source_index = self
            .index_of(id)
            .ok_or(EngineError::BlockNotFound { id })?;
        let source = &self.blocks[source_index];
        let copy = Block {
            id: Uuid::new_v4(),
            kind: source.kind.clone(),
            value: element::deep_copy_with_fresh_ids(&source.value),
            meta: source.meta,
        };
        let index = source_index + 1;
        self.blocks.insert(index, copy.clone());
        self.renumber();
        Ok((index, copy))
    }

    /// Shallow-merge a meta patch, returning the previous meta. Depth-ladder
    /// repair runs store-wide afterward, not here.
    pub fn set_meta(&mut self, id: Uuid, patch: MetaPatch) -> Result<BlockMeta, EngineError> {
        let index = self
            .index_of(id)
            .ok_or(EngineError::BlockNotFound { id })?;
        let block = &mut self.blocks[index];
        let before = block.meta;
        if let Some(depth) = patch.depth {
            block.meta.depth = depth;
        }
        if let Some(align) = patch.align {
            block.meta.align = align;
        }
        Ok(before)
    }

    pub(crate) fn set_meta_raw(&mut self, id: Uuid, meta: BlockMeta) -> Result<(), EngineError> {
        let index = self
            .index_of(id)
            .ok_or(EngineError::BlockNotFound { id })?;
        self.blocks[index].meta = meta;
        Ok(())
    }

    pub(crate) fn set_kind_raw(&mut self, id: Uuid, kind: String) -> Result<(), EngineError> {
        let index = self
            .index_of(id)
            .ok_or(EngineError::BlockNotFound { id })?;
        self.blocks[index].kind = kind;
        Ok(())
    }

    /// Swap in a new immutable value, returning the previous one.
    pub fn replace_value(
        &mut self,
        id: Uuid,
        value: Vec<Arc<ElementNode>>,
    ) -> Result<Vec<Arc<ElementNode>>, EngineError> {
        let index = self
            .index_of(id)
            .ok_or(EngineError::BlockNotFound { id })?;
        Ok(std::mem::replace(&mut self.blocks[index].value, value))
    }

    /// Rewrite every block's `order` to its positional index.
    pub(crate) fn renumber(&mut self) {
        for (index, block) in self.blocks.iter_mut().enumerate() {
            block.meta.order = index;
        }
    }

    /// Repair the depth ladder: a block may sit at most one level deeper than
    /// its predecessor, and the first block sits at depth zero. Returns the
    /// repairs as `(id, before, after)` so callers can record them.
    pub(crate) fn clamp_depths(&mut self) -> Vec<(Uuid, BlockMeta, BlockMeta)> {
        let mut repairs = Vec::new();
        let mut prev_depth: Option<usize> = None;
        for block in &mut self.blocks {
            let allowed = match prev_depth {
                None => 0,
                Some(depth) => depth + 1,
            };
            if block.meta.depth > allowed {
                let before = block.meta;
                block.meta.depth = allowed;
                repairs.push((block.id, before, block.meta));
            }
            prev_depth = Some(block.meta.depth);
        }
        repairs
    }
}
