//! Export contract.
//!
//! Export collaborators (HTML, Markdown, plain text, email, ...) implement
//! [`ExportFormat`] per block type. The core's only obligation is to invoke
//! the serializer in document order and concatenate, passing each block's
//! resolved meta along so consumers can render indentation and alignment
//! without reaching into the store.

use crate::editing::document::Document;
use crate::editing::snapshot::{self, RenderBlock};

/// One export target. `serialize_block` receives the block with its resolved
/// meta flattened out; returning `None` skips the block.
pub trait ExportFormat {
    fn serialize_block(&self, block: &RenderBlock) -> Option<String>;
}

/// Serialize every block in document order and concatenate the results.
pub fn export_document<F: ExportFormat + ?Sized>(doc: &Document, format: &F) -> String {
    let snapshot = snapshot::create_snapshot(doc);
    let mut out = String::new();
    for block in &snapshot.blocks {
        if let Some(rendered) = format.serialize_block(block) {
            out.push_str(&rendered);
        }
    }
    out
}
