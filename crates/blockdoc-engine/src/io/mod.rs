//! Persistence boundary.
//!
//! The engine serializes to a [`DocumentSnapshot`]: a plain mapping from
//! block id to block, JSON-safe and cycle-free. Loading validates the whole
//! snapshot — order density, the depth ladder, element invariants, and
//! per-type shape — before anything replaces the store; invalid snapshots
//! fail with [`EngineError::InvalidDocument`] rather than partially loading.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editing::document::Document;
use crate::editing::element::{ElementChild, ElementNode};
use crate::editing::store::{Block, BlockStore};
use crate::error::EngineError;
use crate::registry::BlockRegistry;

/// Plain persistence form of a document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub blocks: BTreeMap<Uuid, Block>,
}

pub fn serialize(doc: &Document) -> DocumentSnapshot {
    DocumentSnapshot {
        blocks: doc
            .blocks()
            .iter()
            .map(|block| (block.id, block.clone()))
            .collect(),
    }
}

/// Validate a snapshot and build the store it describes.
pub fn load(
    snapshot: &DocumentSnapshot,
    registry: &BlockRegistry,
) -> Result<BlockStore, EngineError> {
    for (id, block) in &snapshot.blocks {
        if *id != block.id {
            return Err(EngineError::invalid_document(format!(
                "key {id} does not match block id {}",
                block.id
            )));
        }
    }

    let mut blocks: Vec<Block> = snapshot.blocks.values().cloned().collect();
    blocks.sort_by_key(|block| block.meta.order);

    for (position, block) in blocks.iter().enumerate() {
        if block.meta.order != position {
            return Err(EngineError::invalid_document(format!(
                "order values must be dense; found {} at position {position}",
                block.meta.order
            )));
        }
    }

    let mut prev_depth: Option<usize> = None;
    for block in &blocks {
        let allowed = match prev_depth {
            None => 0,
            Some(depth) => depth + 1,
        };
        if block.meta.depth > allowed {
            return Err(EngineError::invalid_document(format!(
                "block {} sits at depth {} but at most {allowed} is reachable",
                block.id, block.meta.depth
            )));
        }
        prev_depth = Some(block.meta.depth);
    }

    let mut element_ids = HashSet::new();
    for block in &blocks {
        validate_block(block, registry, &mut element_ids)?;
    }

    Ok(BlockStore::from_blocks(blocks))
}

fn validate_block(
    block: &Block,
    registry: &BlockRegistry,
    seen: &mut HashSet<Uuid>,
) -> Result<(), EngineError> {
    if block.value.is_empty() {
        return Err(EngineError::invalid_document(format!(
            "block {} has no content",
            block.id
        )));
    }
    for root in &block.value {
        validate_element(root, seen)?;
    }
    if let Some(descriptor) = registry.descriptor(&block.kind)
        && let Some(validate) = descriptor.validate
    {
        validate(block).map_err(|error| {
            EngineError::invalid_document(format!("block {}: {error}", block.id))
        })?;
    }
    Ok(())
}

fn validate_element(node: &ElementNode, seen: &mut HashSet<Uuid>) -> Result<(), EngineError> {
    if !seen.insert(node.id) {
        return Err(EngineError::invalid_document(format!(
            "duplicate element id {}",
            node.id
        )));
    }
    if node.children.is_empty() {
        return Err(EngineError::invalid_document(format!(
            "element {} has no children",
            node.id
        )));
    }
    if node.is_void() {
        let well_formed = node.children.len() == 1
            && matches!(&node.children[0], ElementChild::Text(leaf) if leaf.is_empty());
        if !well_formed {
            return Err(EngineError::invalid_document(format!(
                "void element {} must hold a single empty placeholder leaf",
                node.id
            )));
        }
        return Ok(());
    }
    for child in &node.children {
        if let ElementChild::Element(inner) = child {
            validate_element(inner, seen)?;
        }
    }
    Ok(())
}
