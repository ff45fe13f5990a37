use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use uuid::Uuid;

use crate::editing::document::{Document, Session};
use crate::editing::element::{self, ElementChild, ElementNode, Path, PropValue, TextLeaf};
use crate::editing::history::{HistoryEntry, Origin, PrimitiveOp};
use crate::editing::normalize::normalize_block;
use crate::editing::patch::Patch;
use crate::editing::selection::{Selection, SelectionSource};
use crate::editing::store::{Block, BlockStore, MetaPatch};
use crate::error::EngineError;
use crate::registry::{BlockDescriptor, BlockRegistry, DEFAULT_BLOCK};

/// Document-level commands. Every mutation, local or remote, enters through
/// one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Insert a new block of `kind` at `at` (clamped). `value` overrides the
    /// type's default scaffold.
    InsertBlock {
        kind: String,
        at: usize,
        value: Option<Vec<Arc<ElementNode>>>,
    },
    DeleteBlock {
        id: Uuid,
    },
    MoveBlock {
        id: Uuid,
        to: usize,
    },
    DuplicateBlock {
        id: Uuid,
        focus: bool,
    },
    /// Convert the selected block(s) to `kind`; a homogeneous selection
    /// already of `kind` reverts to the default type instead.
    ToggleBlock {
        kind: String,
        options: ToggleOptions,
    },
    SetMeta {
        id: Uuid,
        patch: MetaPatch,
    },
    /// Swap in a whole new value for a block (direct content edit).
    ReplaceValue {
        id: Uuid,
        value: Vec<Arc<ElementNode>>,
    },
    /// Path-addressed primitive mutation of a block's element tree.
    Tree {
        id: Uuid,
        op: TreeOp,
    },
    /// Explicit multi-command batch; nested batches flatten into the
    /// outermost one.
    Batch(Vec<Cmd>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleOptions {
    /// Delete blocks that are already empty instead of converting them.
    pub delete_text: bool,
}

/// The four ElementTree primitives, addressed by path within one block.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeOp {
    InsertChild {
        parent: Path,
        index: usize,
        child: ElementChild,
    },
    RemoveChild {
        parent: Path,
        index: usize,
    },
    SetProps {
        path: Path,
        props: BTreeMap<String, PropValue>,
    },
    MergeSiblings {
        parent: Path,
        index: usize,
    },
}

/// Collects the commands of a [`Session::batch`] closure.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    cmds: Vec<Cmd>,
}

impl BatchBuilder {
    pub fn push(&mut self, cmd: Cmd) -> &mut Self {
        self.cmds.push(cmd);
        self
    }

    pub(crate) fn into_commands(self) -> Vec<Cmd> {
        self.cmds
    }
}

/// In-flight state of one operation: a working copy of the store and
/// selection plus the primitive ops recorded so far. Dropping it on error is
/// the rollback.
struct Workspace {
    store: BlockStore,
    selection: Selection,
    ops: Vec<PrimitiveOp>,
    /// Blocks whose value changed and still need normalization.
    pending: Vec<Uuid>,
}

/// Run one command (or batch) through the pipeline:
/// validate → apply to a working copy → normalize → renumber → commit.
/// Either the whole unit commits and produces exactly one history entry, or
/// it fails and the live document is untouched.
pub(crate) fn execute(
    session: &mut Session,
    cmd: Cmd,
    origin: Origin,
) -> Result<Patch, EngineError> {
    let commands = flatten(cmd);
    let selection_before = session.selection.clone();

    match run_pipeline(session, &commands) {
        Ok(work) => Ok(commit(session, work, selection_before, origin)),
        Err(error) => {
            if !origin.is_local() {
                tracing::warn!(%error, "rejected remote operation");
            }
            Err(error)
        }
    }
}

/// Replace the entire document with imported blocks: the core assigns final
/// order values and runs full normalization over the whole batch before
/// accepting it as one committed, undoable state.
pub(crate) fn import(session: &mut Session, blocks: Vec<Block>) -> Result<Patch, EngineError> {
    let mut seen = std::collections::HashSet::new();
    for block in &blocks {
        if block.value.is_empty() {
            return Err(EngineError::invariant(format!(
                "imported block {} has no content",
                block.id
            )));
        }
        if !seen.insert(block.id) {
            return Err(EngineError::invariant(format!(
                "duplicate block id {} in import",
                block.id
            )));
        }
    }

    let selection_before = session.selection.clone();
    let mut work = Workspace {
        store: session.doc.store.clone(),
        selection: session.selection.clone(),
        ops: Vec::new(),
        pending: Vec::new(),
    };

    while let Some(block) = work.store.get_at(0).cloned() {
        work.store.remove(block.id)?;
        work.ops.push(PrimitiveOp::RemoveNode { index: 0, block });
    }
    work.selection.clear();

    for (index, block) in blocks.into_iter().enumerate() {
        work.pending.push(block.id);
        work.store.insert(block.clone(), index);
        work.ops.push(PrimitiveOp::InsertNode { index, block });
    }

    normalize_pending(&mut work, &session.registry)?;
    work.store.renumber();
    for (id, before, after) in work.store.clamp_depths() {
        work.ops.push(PrimitiveOp::SetNodeProps { id, before, after });
    }

    Ok(commit(session, work, selection_before, Origin::Local))
}

fn commit(
    session: &mut Session,
    work: Workspace,
    selection_before: Selection,
    origin: Origin,
) -> Patch {
    // A unit of work that recorded no primitive ops changed nothing: the
    // document value and its version stay as they are, and nothing lands on
    // the undo stack.
    if work.ops.is_empty() {
        session.selection = work.selection;
        return Patch {
            changed: Vec::new(),
            new_selection: session.selection.clone(),
            version: session.doc.version,
        };
    }

    let version = session.doc.version + 1;
    let mut changed = Vec::new();
    for op in &work.ops {
        let id = op.touched_id();
        if !changed.contains(&id) {
            changed.push(id);
        }
    }

    session.doc = Document {
        store: work.store,
        version,
    };
    session.selection = work.selection;
    session.history.record(HistoryEntry {
        ops: work.ops,
        selection_before,
        selection_after: session.selection.clone(),
        stamp: 0,
        origin,
    });

    Patch {
        changed,
        new_selection: session.selection.clone(),
        version,
    }
}

fn run_pipeline(session: &Session, commands: &[Cmd]) -> Result<Workspace, EngineError> {
    let mut work = Workspace {
        store: session.doc.store.clone(),
        selection: session.selection.clone(),
        ops: Vec::new(),
        pending: Vec::new(),
    };

    for cmd in commands {
        apply_cmd(&mut work, &session.registry, cmd)?;
    }

    normalize_pending(&mut work, &session.registry)?;

    work.store.renumber();
    for (id, before, after) in work.store.clamp_depths() {
        work.ops.push(PrimitiveOp::SetNodeProps { id, before, after });
    }

    Ok(work)
}

fn apply_cmd(
    work: &mut Workspace,
    registry: &BlockRegistry,
    cmd: &Cmd,
) -> Result<(), EngineError> {
    match cmd {
        Cmd::InsertBlock { kind, at, value } => {
            let descriptor = lookup(registry, kind)?;
            let value = match value {
                Some(value) => value.clone(),
                None => descriptor.build_value(),
            };
            if value.is_empty() {
                return Err(EngineError::invariant(
                    "a block needs at least one root element",
                ));
            }
            let block = Block::new(kind.clone(), value);
            let at = (*at).min(work.store.len());
            work.store.insert(block.clone(), at);
            work.pending.push(block.id);
            work.ops.push(PrimitiveOp::InsertNode { index: at, block });
            work.selection.after_insert(at);
        }
        Cmd::DeleteBlock { id } => {
            let (index, block) = work.store.remove(*id)?;
            work.ops.push(PrimitiveOp::RemoveNode { index, block });
            work.selection.after_remove(index);
        }
        Cmd::MoveBlock { id, to } => {
            let (from, to) = work.store.move_to(*id, *to)?;
            if from != to {
                work.ops.push(PrimitiveOp::MoveNode { id: *id, from, to });
                work.selection.after_move(from, to);
            }
        }
        Cmd::DuplicateBlock { id, focus } => {
            let (index, copy) = work.store.duplicate(*id)?;
            work.pending.push(copy.id);
            work.ops.push(PrimitiveOp::InsertNode { index, block: copy });
            work.selection.after_insert(index);
            if *focus {
                work.selection.set_current(Some(index), SelectionSource::Api);
            }
        }
        Cmd::ToggleBlock { kind, options } => {
            apply_toggle(work, registry, kind, options)?;
        }
        Cmd::SetMeta { id, patch } => {
            let before = work.store.set_meta(*id, *patch)?;
            let after = work
                .store
                .get(*id)
                .ok_or(EngineError::BlockNotFound { id: *id })?
                .meta;
            if before != after {
                work.ops.push(PrimitiveOp::SetNodeProps {
                    id: *id,
                    before,
                    after,
                });
            }
        }
        Cmd::ReplaceValue { id, value } => {
            if value.is_empty() {
                return Err(EngineError::invariant(
                    "a block needs at least one root element",
                ));
            }
            let before = work.store.replace_value(*id, value.clone())?;
            work.pending.push(*id);
            work.ops.push(PrimitiveOp::SetNodeValue {
                id: *id,
                before,
                after: value.clone(),
            });
        }
        Cmd::Tree { id, op } => {
            let block = work
                .store
                .get(*id)
                .ok_or(EngineError::BlockNotFound { id: *id })?;
            let next = match op {
                TreeOp::InsertChild {
                    parent,
                    index,
                    child,
                } => element::insert_child(&block.value, parent, *index, child.clone())?,
                TreeOp::RemoveChild { parent, index } => {
                    element::remove_child(&block.value, parent, *index)?
                }
                TreeOp::SetProps { path, props } => {
                    element::set_props(&block.value, path, props)?
                }
                TreeOp::MergeSiblings { parent, index } => {
                    element::merge_siblings(&block.value, parent, *index)?
                }
            };
            let before = work.store.replace_value(*id, next.clone())?;
            work.pending.push(*id);
            work.ops.push(PrimitiveOp::SetNodeValue {
                id: *id,
                before,
                after: next,
            });
        }
        Cmd::Batch(cmds) => {
            // Flattened upfront; kept here so a hand-built nested batch
            // still applies.
            for cmd in cmds {
                apply_cmd(work, registry, cmd)?;
            }
        }
    }
    Ok(())
}

/// Per-block toggle with the involution policy: a homogeneous selection
/// already of `kind` reverts to the default type; in a heterogeneous
/// selection every non-matching block converts and matching ones are left
/// as-is.
fn apply_toggle(
    work: &mut Workspace,
    registry: &BlockRegistry,
    kind: &str,
    options: &ToggleOptions,
) -> Result<(), EngineError> {
    let mut targets = work.selection.targets();
    if targets.is_empty() {
        return Err(EngineError::invariant(
            "toggle requires a current or selected block",
        ));
    }
    targets.sort_unstable();
    targets.dedup();

    let mut target_ids = Vec::with_capacity(targets.len());
    for &index in &targets {
        let block = work.store.get_at(index).ok_or_else(|| {
            EngineError::invariant(format!("selection references missing block index {index}"))
        })?;
        target_ids.push(block.id);
    }

    let homogeneous = target_ids.iter().all(|id| {
        work.store
            .get(*id)
            .is_some_and(|block| block.kind == kind)
    });

    for id in target_ids {
        let block = work
            .store
            .get(id)
            .ok_or(EngineError::BlockNotFound { id })?;

        if options.delete_text && block.is_blank() {
            let (index, removed) = work.store.remove(id)?;
            work.ops.push(PrimitiveOp::RemoveNode {
                index,
                block: removed,
            });
            work.selection.after_remove(index);
            continue;
        }

        let target_kind = if homogeneous {
            DEFAULT_BLOCK
        } else if block.kind == kind {
            continue;
        } else {
            kind
        };
        convert_block(work, registry, id, target_kind)?;
    }
    Ok(())
}

fn convert_block(
    work: &mut Workspace,
    registry: &BlockRegistry,
    id: Uuid,
    target_kind: &str,
) -> Result<(), EngineError> {
    let descriptor = lookup(registry, target_kind)?;
    let block = work
        .store
        .get(id)
        .ok_or(EngineError::BlockNotFound { id })?;
    if block.kind == target_kind {
        return Ok(());
    }

    let before_kind = block.kind.clone();
    let next = convert_value(&block.value, descriptor);
    let before_value = work.store.replace_value(id, next.clone())?;
    work.store.set_kind_raw(id, target_kind.to_string())?;
    work.pending.push(id);
    work.ops.push(PrimitiveOp::SetNodeKind {
        id,
        before: before_kind,
        after: target_kind.to_string(),
    });
    work.ops.push(PrimitiveOp::SetNodeValue {
        id,
        before: before_value,
        after: next,
    });
    Ok(())
}

/// Re-wrap a block's inline content into another type's expected shape: the
/// collected leaves land in the innermost slot of the target scaffold. Void
/// targets take the bare scaffold.
fn convert_value(value: &[Arc<ElementNode>], descriptor: &BlockDescriptor) -> Vec<Arc<ElementNode>> {
    let scaffold = descriptor.build_value();
    let Some(first) = scaffold.first() else {
        return scaffold;
    };
    if first.is_void() {
        return scaffold;
    }

    let mut leaves: Vec<ElementChild> = element::collect_leaves(value)
        .into_iter()
        .filter(|leaf| !leaf.is_empty())
        .map(ElementChild::Text)
        .collect();
    if leaves.is_empty() {
        leaves.push(ElementChild::Text(TextLeaf::empty()));
    }

    vec![Arc::new(fill_innermost_slot(first, &leaves))]
}

fn fill_innermost_slot(node: &ElementNode, leaves: &[ElementChild]) -> ElementNode {
    let mut node = node.clone();
    let slot = node
        .children
        .iter()
        .position(|child| matches!(child, ElementChild::Element(_)));
    match slot {
        Some(ix) => {
            if let ElementChild::Element(inner) = &node.children[ix] {
                node.children[ix] = ElementChild::element(fill_innermost_slot(inner, leaves));
            }
        }
        None => node.children = leaves.to_vec(),
    }
    node
}

/// Normalize every block whose value changed, to a fixed point, feeding
/// promoted blocks back into the worklist.
fn normalize_pending(work: &mut Workspace, registry: &BlockRegistry) -> Result<(), EngineError> {
    let mut queue: VecDeque<Uuid> = work.pending.drain(..).collect();
    while let Some(id) = queue.pop_front() {
        // Deleted later in the same batch; nothing left to repair.
        let Some(index) = work.store.index_of(id) else {
            continue;
        };
        let Some(block) = work.store.get(id).cloned() else {
            continue;
        };
        let outcome = normalize_block(&block, registry)?;
        if !outcome.changed {
            continue;
        }
        if outcome.value != block.value {
            let before = work.store.replace_value(id, outcome.value.clone())?;
            work.ops.push(PrimitiveOp::SetNodeValue {
                id,
                before,
                after: outcome.value,
            });
        }
        let mut insert_at = index + 1;
        for root in outcome.promoted {
            let promoted = Block::new(block.kind.clone(), vec![root]);
            queue.push_back(promoted.id);
            work.store.insert(promoted.clone(), insert_at);
            work.ops.push(PrimitiveOp::InsertNode {
                index: insert_at,
                block: promoted,
            });
            work.selection.after_insert(insert_at);
            insert_at += 1;
        }
    }
    Ok(())
}

fn lookup<'r>(
    registry: &'r BlockRegistry,
    kind: &str,
) -> Result<&'r BlockDescriptor, EngineError> {
    registry
        .descriptor(kind)
        .ok_or_else(|| EngineError::invariant(format!("unregistered block type `{kind}`")))
}

fn flatten(cmd: Cmd) -> Vec<Cmd> {
    match cmd {
        Cmd::Batch(cmds) => cmds.into_iter().flat_map(flatten).collect(),
        other => vec![other],
    }
}
