/*!
 * Editing core.
 *
 * The engine keeps a document as an ordered collection of blocks, each
 * holding a small tree of typed elements and inline text runs, and keeps
 * that structure consistent under arbitrary interleaved edits.
 *
 * ## Architecture
 *
 * - **Single mutation entry point**: every edit — direct text editing,
 *   structural commands, multi-block batches, remote collaboration — is a
 *   [`Cmd`] applied through [`Session::apply`]. A command either commits
 *   atomically or leaves the document untouched.
 * - **Pure tree primitives**: `element` holds the four primitive mutations
 *   (insert child, remove child, set props, merge siblings). All of them
 *   return new trees sharing unmodified substructure, so concurrent readers
 *   never observe a torn state.
 * - **Normalization to a fixed point**: after every mutation the affected
 *   blocks run their type-specific repair rules (`normalize`) until no rule
 *   fires — adjacent same-type siblings merge, surplus singleton roots are
 *   promoted into new sibling blocks, and containers keep a placeholder
 *   leaf as a cursor target.
 * - **Dense ordering**: `store` owns block identity and renumbers every
 *   block's `order` to its positional index after each structural change.
 * - **Read API**: consumers render from immutable [`Snapshot`]s; paths are
 *   valid only against the snapshot they were computed from and are
 *   re-derived by node id after any edit.
 * - **History**: committed local work lands on an undo stack of reversible
 *   primitive-op batches (`history`); remote-origin operations run the same
 *   pipeline but are never recorded locally.
 *
 * ## Module structure
 *
 * - **`element`**: element tree model and the pure mutation primitives
 * - **`normalize`**: per-block-type structural repair to a fixed point
 * - **`store`**: the ordered block collection and its metadata
 * - **`commands`**: the operation engine and its command set
 * - **`selection`**: cursor and multi-block selection state
 * - **`history`**: undo/redo stacks of reversible operation batches
 * - **`document`**: the immutable `Document` value and the `Session` facade
 * - **`snapshot`**: immutable render views
 * - **`patch`**: per-commit result metadata
 */

pub mod commands;
pub mod document;
pub mod element;
pub mod history;
pub mod normalize;
pub mod patch;
pub mod selection;
pub mod snapshot;
pub mod store;

pub use commands::{BatchBuilder, Cmd, ToggleOptions, TreeOp};
pub use document::{Document, Session};
pub use element::{ElementChild, ElementNode, NodeKind, Path, PropValue, TextLeaf};
pub use history::{History, HistoryEntry, Origin, PrimitiveOp};
pub use normalize::{NormalizeOutcome, normalize_block};
pub use patch::Patch;
pub use selection::{InlineSelection, Selection, SelectionSource};
pub use snapshot::{RenderBlock, Snapshot};
pub use store::{Align, Block, BlockMeta, BlockStore, MetaPatch};
