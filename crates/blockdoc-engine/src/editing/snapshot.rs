use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::editing::document::Document;
use crate::editing::element::{self, ElementNode};
use crate::editing::store::Align;

/// Immutable view of the document for rendering.
///
/// The snapshot shares element trees with the model via `Arc`; consumers
/// read it and emit UI events back through the session's public methods,
/// never mutating what they were handed. A snapshot is valid for exactly the
/// version it carries; paths computed against it do not survive mutations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub version: u64,
    /// Blocks in document order.
    pub blocks: Vec<RenderBlock>,
}

/// One block prepared for rendering, with its resolved metadata flattened
/// out so consumers can indent and align without reaching into the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderBlock {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub order: usize,
    pub depth: usize,
    pub align: Align,
    pub value: Vec<Arc<ElementNode>>,
}

impl RenderBlock {
    pub fn plain_text(&self) -> String {
        element::plain_text(&self.value)
    }
}

pub(crate) fn create_snapshot(doc: &Document) -> Snapshot {
    Snapshot {
        version: doc.version(),
        blocks: doc
            .blocks()
            .iter()
            .map(|block| RenderBlock {
                id: block.id,
                kind: block.kind.clone(),
                order: block.meta.order,
                depth: block.meta.depth,
                align: block.meta.align,
                value: block.value.clone(),
            })
            .collect(),
    }
}
