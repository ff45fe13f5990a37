//! Block type registry.
//!
//! Block and element "types" are open strings dispatched by lookup: each
//! registered [`BlockDescriptor`] names the type, its root element shape, the
//! normalization rules that keep it consistent, and an optional shape
//! validator. The built-in palette covers the stock block types; embedders
//! extend the set with [`BlockRegistry::register`].

mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use crate::editing::element::{ElementNode, NodeKind};
use crate::editing::store::Block;

/// The type every toggle reverts to and every fresh document starts from.
pub const DEFAULT_BLOCK: &str = "Paragraph";

/// A normalization rule attached to a block type, applied to a fixed point
/// after every mutation of that block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Adjacent sibling elements of this type merge into the earlier one.
    MergeAdjacent { kind: String },
    /// At most one top-level element of this type per block; surplus
    /// instances are promoted into new sibling blocks.
    SingletonRoot { kind: String },
    /// Containers of this type are ephemeral: removed outright when they
    /// hold nothing but empty text.
    DropEmptyEphemeral { kind: String },
}

/// Everything the engine knows about one block type.
#[derive(Debug, Clone)]
pub struct BlockDescriptor {
    pub kind: String,
    /// Element type of the block's root.
    pub root: String,
    pub node_type: NodeKind,
    pub rules: Vec<Rule>,
    /// Shape validator run at the normalization fixed point; a failure rolls
    /// the triggering batch back.
    pub validate: Option<fn(&Block) -> anyhow::Result<()>>,
    /// Optional scaffold for block types whose default value is richer than
    /// a bare root element.
    scaffold: Option<fn() -> ElementNode>,
}

impl BlockDescriptor {
    pub fn new(kind: impl Into<String>, root: impl Into<String>, node_type: NodeKind) -> Self {
        Self {
            kind: kind.into(),
            root: root.into(),
            node_type,
            rules: Vec::new(),
            validate: None,
            scaffold: None,
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_validator(mut self, validate: fn(&Block) -> anyhow::Result<()>) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn with_scaffold(mut self, scaffold: fn() -> ElementNode) -> Self {
        self.scaffold = Some(scaffold);
        self
    }

    /// Default value for a freshly inserted block of this type.
    pub fn build_value(&self) -> Vec<Arc<ElementNode>> {
        let root = match self.scaffold {
            Some(scaffold) => scaffold(),
            None => ElementNode::root(self.root.clone(), self.node_type),
        };
        vec![Arc::new(root)]
    }
}

/// Name-to-descriptor lookup for every known block type.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    descriptors: HashMap<String, BlockDescriptor>,
}

impl BlockRegistry {
    /// Registry with the built-in block palette.
    pub fn builtin() -> Self {
        let mut registry = Self {
            descriptors: HashMap::new(),
        };
        for descriptor in builtin::all() {
            registry.register(descriptor);
        }
        registry
    }

    /// Register or replace a block type descriptor.
    pub fn register(&mut self, descriptor: BlockDescriptor) {
        self.descriptors
            .insert(descriptor.kind.clone(), descriptor);
    }

    pub fn descriptor(&self, kind: &str) -> Option<&BlockDescriptor> {
        self.descriptors.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.descriptors.contains_key(kind)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_palette_registers_default_type() {
        let registry = BlockRegistry::builtin();
        assert!(registry.contains(DEFAULT_BLOCK));
        let descriptor = registry.descriptor(DEFAULT_BLOCK).unwrap();
        assert_eq!(descriptor.root, "paragraph");
    }

    #[test]
    fn test_build_value_produces_single_root_with_marker() {
        let registry = BlockRegistry::builtin();
        let value = registry.descriptor("Divider").unwrap().build_value();
        assert_eq!(value.len(), 1);
        assert_eq!(value[0].node_type, Some(NodeKind::Void));
    }

    #[test]
    fn test_register_replaces_existing_descriptor() {
        let mut registry = BlockRegistry::builtin();
        registry.register(BlockDescriptor::new("Paragraph", "fancy-paragraph", NodeKind::Block));
        assert_eq!(
            registry.descriptor("Paragraph").unwrap().root,
            "fancy-paragraph"
        );
    }

    #[test]
    fn test_accordion_scaffold_builds_item_slots() {
        let registry = BlockRegistry::builtin();
        let value = registry.descriptor("Accordion").unwrap().build_value();
        let root = &value[0];
        assert_eq!(root.kind, "accordion-list");
        let item = root.children[0].as_element().unwrap();
        assert_eq!(item.kind, "accordion-list-item");
        assert_eq!(item.children.len(), 2);
    }
}
