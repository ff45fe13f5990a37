use uuid::Uuid;

use crate::editing::commands::{self, BatchBuilder, Cmd, ToggleOptions};
use crate::editing::history::{History, Origin, PrimitiveOp};
use crate::editing::patch::Patch;
use crate::editing::selection::{InlineSelection, Selection, SelectionSource};
use crate::editing::snapshot::{self, Snapshot};
use crate::editing::store::{Block, BlockStore};
use crate::error::EngineError;
use crate::export::{self, ExportFormat};
use crate::io::{self, DocumentSnapshot};
use crate::registry::{BlockDescriptor, BlockRegistry, DEFAULT_BLOCK};

/// Immutable document value: the ordered block collection plus a version
/// counter for change detection. Every committed operation swaps in a new
/// `Document`; readers holding the old one never observe a torn state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub(crate) store: BlockStore,
    pub(crate) version: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        self.store.blocks()
    }

    pub fn get(&self, id: Uuid) -> Option<&Block> {
        self.store.get(id)
    }

    pub fn get_at(&self, index: usize) -> Option<&Block> {
        self.store.get_at(index)
    }

    pub fn index_of(&self, id: Uuid) -> Option<usize> {
        self.store.index_of(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Editing context threaded through every call: the current document value,
/// selection, history, and the block type registry. This is the whole public
/// mutation surface; there is no ambient editor state anywhere else.
///
/// ## Usage pattern
///
/// ```rust
/// use blockdoc_engine::editing::Session;
///
/// let mut session = Session::new();
/// let patch = session.insert_block("Paragraph", 0).unwrap();
/// assert_eq!(session.document().len(), 1);
/// assert_eq!(patch.version, session.document().version());
///
/// // Remote collaborators enter the same pipeline but skip local history.
/// let snapshot = session.snapshot();
/// assert_eq!(snapshot.blocks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) doc: Document,
    pub(crate) selection: Selection,
    pub(crate) history: History,
    pub(crate) registry: BlockRegistry,
}

impl Session {
    /// Empty document with the built-in block palette.
    pub fn new() -> Self {
        Self::with_registry(BlockRegistry::builtin())
    }

    pub fn with_registry(registry: BlockRegistry) -> Self {
        Self {
            doc: Document::new(),
            selection: Selection::default(),
            history: History::new(),
            registry,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Register an additional block type descriptor.
    pub fn register_block(&mut self, descriptor: BlockDescriptor) {
        self.registry.register(descriptor);
    }

    // ---- operation engine ----

    /// Apply a local command as one atomic, undoable unit.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EngineError> {
        commands::execute(self, cmd, Origin::Local)
    }

    /// Apply an already-resolved remote operation: same validation and
    /// normalization, but nothing is recorded on the local undo stack. A
    /// remote operation that would violate a structural invariant is
    /// rejected and logged, never partially applied.
    pub fn apply_remote(&mut self, cmd: Cmd) -> Result<Patch, EngineError> {
        commands::execute(self, cmd, Origin::Remote)
    }

    /// Collect the commands pushed by `f` and commit them as one history
    /// entry. Reentrant-safe: batches nested inside flatten into this one.
    pub fn batch(&mut self, f: impl FnOnce(&mut BatchBuilder)) -> Result<Patch, EngineError> {
        let mut builder = BatchBuilder::default();
        f(&mut builder);
        self.apply(Cmd::Batch(builder.into_commands()))
    }

    pub fn insert_block(&mut self, kind: &str, at: usize) -> Result<Patch, EngineError> {
        self.apply(Cmd::InsertBlock {
            kind: kind.to_string(),
            at,
            value: None,
        })
    }

    pub fn delete_block(&mut self, id: Uuid) -> Result<Patch, EngineError> {
        self.apply(Cmd::DeleteBlock { id })
    }

    pub fn move_block(&mut self, id: Uuid, to: usize) -> Result<Patch, EngineError> {
        self.apply(Cmd::MoveBlock { id, to })
    }

    /// Duplicate a block and focus the copy.
    pub fn duplicate_block(&mut self, id: Uuid) -> Result<Patch, EngineError> {
        self.apply(Cmd::DuplicateBlock { id, focus: true })
    }

    pub fn toggle_block(&mut self, kind: &str, options: ToggleOptions) -> Result<Patch, EngineError> {
        self.apply(Cmd::ToggleBlock {
            kind: kind.to_string(),
            options,
        })
    }

    // ---- history ----

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Revert the most recent local entry. `Ok(None)` when there is nothing
    /// to undo.
    pub fn undo(&mut self) -> Result<Option<Patch>, EngineError> {
        let Some(entry) = self.history.pop_undo() else {
            return Ok(None);
        };
        let mut store = self.doc.store.clone();
        for op in entry.ops.iter().rev() {
            if let Err(error) = op.invert().apply(&mut store) {
                self.history.push_undo(entry);
                return Err(error);
            }
        }
        store.renumber();
        store.clamp_depths();

        let version = self.doc.version + 1;
        self.doc = Document { store, version };
        self.selection = entry.selection_before.clone();
        let patch = Patch {
            changed: touched_ids(&entry.ops),
            new_selection: self.selection.clone(),
            version,
        };
        self.history.push_redo(entry);
        Ok(Some(patch))
    }

    /// Reapply the most recently undone entry.
    pub fn redo(&mut self) -> Result<Option<Patch>, EngineError> {
        let Some(entry) = self.history.pop_redo() else {
            return Ok(None);
        };
        let mut store = self.doc.store.clone();
        for op in &entry.ops {
            if let Err(error) = op.apply(&mut store) {
                self.history.push_redo(entry);
                return Err(error);
            }
        }
        store.renumber();
        store.clamp_depths();

        let version = self.doc.version + 1;
        self.doc = Document { store, version };
        self.selection = entry.selection_after.clone();
        let patch = Patch {
            changed: touched_ids(&entry.ops),
            new_selection: self.selection.clone(),
            version,
        };
        self.history.push_undo(entry);
        Ok(Some(patch))
    }

    // ---- selection model ----

    pub fn set_current(
        &mut self,
        index: Option<usize>,
        source: SelectionSource,
    ) -> Result<(), EngineError> {
        if let Some(ix) = index
            && ix >= self.doc.len()
        {
            return Err(EngineError::invariant(format!("no block at index {ix}")));
        }
        self.selection.set_current(index, source);
        Ok(())
    }

    pub fn set_selected_range(
        &mut self,
        indices: Vec<usize>,
        source: SelectionSource,
    ) -> Result<(), EngineError> {
        for &ix in &indices {
            if ix >= self.doc.len() {
                return Err(EngineError::invariant(format!("no block at index {ix}")));
            }
        }
        self.selection.set_selected_range(indices, source);
        Ok(())
    }

    pub fn set_inline_selection(&mut self, inline: InlineSelection, source: SelectionSource) {
        self.selection.set_inline(inline, source);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ---- collaborator surfaces ----

    /// Immutable render view in document order. Renderers read it and feed
    /// UI events back through the session; they never mutate the tree.
    pub fn snapshot(&self) -> Snapshot {
        snapshot::create_snapshot(&self.doc)
    }

    /// Persistence view: a plain id-to-block mapping, JSON-safe.
    pub fn serialize(&self) -> DocumentSnapshot {
        io::serialize(&self.doc)
    }

    /// Replace the document with a loaded snapshot after full structural
    /// validation; an invalid snapshot leaves everything untouched. History
    /// and selection restart from scratch.
    pub fn load(&mut self, snapshot: &DocumentSnapshot) -> Result<(), EngineError> {
        let store = io::load(snapshot, &self.registry)?;
        self.doc = Document {
            store,
            version: self.doc.version + 1,
        };
        self.selection.clear();
        self.history.clear();
        Ok(())
    }

    /// Accept an importer's ordered block array: assigns final order values
    /// and runs full normalization over the batch before committing.
    pub fn load_blocks(&mut self, blocks: Vec<Block>) -> Result<Patch, EngineError> {
        commands::import(self, blocks)
    }

    /// Run an export collaborator over every block in document order,
    /// concatenating its output.
    pub fn export<F: ExportFormat + ?Sized>(&self, format: &F) -> String {
        export::export_document(&self.doc, format)
    }

    /// The block type toggles revert to.
    pub fn default_kind(&self) -> &'static str {
        DEFAULT_BLOCK
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn touched_ids(ops: &[PrimitiveOp]) -> Vec<Uuid> {
    let mut changed = Vec::new();
    for op in ops {
        let id = op.touched_id();
        if !changed.contains(&id) {
            changed.push(id);
        }
    }
    changed
}
