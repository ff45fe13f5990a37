//! Structural repair pass.
//!
//! After every mutation of a block the engine runs that block's type-specific
//! normalization to a fixed point, like a small local term-rewriting system:
//! adjacent same-type siblings merge, surplus singleton roots are promoted
//! into new sibling blocks, hollowed-out ephemeral containers disappear, and
//! everything else is refilled with a placeholder leaf so the cursor still
//! has somewhere to land.

use std::sync::Arc;

use anyhow::anyhow;

use crate::editing::element::{ElementChild, ElementNode, TextLeaf};
use crate::editing::store::Block;
use crate::error::EngineError;
use crate::registry::{BlockRegistry, Rule};

/// Rewrite passes allowed before normalization is declared divergent.
const MAX_PASSES: usize = 64;

/// Result of normalizing one block to a fixed point.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    /// The repaired value.
    pub value: Vec<Arc<ElementNode>>,
    /// Surplus singleton roots promoted out of the block, in document order.
    /// Each becomes the entire value of a new sibling block inserted right
    /// after the source, with default metadata.
    pub promoted: Vec<Arc<ElementNode>>,
    /// Whether any rule fired at all.
    pub changed: bool,
}

/// Run the block's normalization rules until no rule applies, then its shape
/// validator. A divergent rule set or failed validator surfaces as
/// [`EngineError::Normalization`]; the caller rolls the triggering batch back.
pub fn normalize_block(
    block: &Block,
    registry: &BlockRegistry,
) -> Result<NormalizeOutcome, EngineError> {
    let descriptor = registry.descriptor(&block.kind);
    let rules: &[Rule] = descriptor.map(|d| d.rules.as_slice()).unwrap_or(&[]);

    let mut value = block.value.clone();
    let mut promoted = Vec::new();
    let mut changed = false;

    for pass in 0.. {
        if pass >= MAX_PASSES {
            return Err(EngineError::Normalization {
                kind: block.kind.clone(),
                source: anyhow!("no fixed point after {MAX_PASSES} passes"),
            });
        }

        let mut pass_changed = false;

        // Child-level rules, bottom-up through every root's subtree.
        let mut next: Vec<Arc<ElementNode>> = Vec::with_capacity(value.len());
        for root in &value {
            match rewrite_node(root, rules) {
                Some(new_root) => {
                    pass_changed = true;
                    next.push(Arc::new(new_root));
                }
                None => next.push(root.clone()),
            }
        }

        // Root-level structure: merges, ephemeral cleanup, then promotion.
        for rule in rules {
            match rule {
                Rule::MergeAdjacent { kind } => {
                    pass_changed |= merge_adjacent_roots(&mut next, kind);
                }
                Rule::DropEmptyEphemeral { kind } => {
                    pass_changed |= drop_hollow_roots(&mut next, kind);
                }
                Rule::SingletonRoot { .. } => {}
            }
        }
        for rule in rules {
            if let Rule::SingletonRoot { kind } = rule {
                let batch = promote_surplus(&mut next, kind);
                if !batch.is_empty() {
                    pass_changed = true;
                    promoted.extend(batch);
                }
            }
        }

        value = next;
        if !pass_changed {
            break;
        }
        changed = true;
    }

    if let Some(descriptor) = descriptor
        && let Some(validate) = descriptor.validate
    {
        let candidate = Block {
            id: block.id,
            kind: block.kind.clone(),
            value: value.clone(),
            meta: block.meta,
        };
        validate(&candidate).map_err(|source| EngineError::Normalization {
            kind: block.kind.clone(),
            source,
        })?;
    }

    if changed {
        tracing::debug!(
            block = %block.id,
            kind = %block.kind,
            promoted = promoted.len(),
            "normalized block"
        );
    }

    Ok(NormalizeOutcome {
        value,
        promoted,
        changed,
    })
}

/// A container with no element children and only empty text is "fully empty
/// of meaningful children": the state ephemeral cleanup looks for.
fn is_hollow(node: &ElementNode) -> bool {
    node.children
        .iter()
        .all(|child| matches!(child, ElementChild::Text(leaf) if leaf.is_empty()))
}

/// Apply child-level rules through the subtree, children first. Returns the
/// rewritten node, or `None` when nothing fired. Untouched children keep
/// their `Arc`s.
fn rewrite_node(node: &ElementNode, rules: &[Rule]) -> Option<ElementNode> {
    let mut changed = false;
    let mut children: Vec<ElementChild> = Vec::with_capacity(node.children.len());
    for child in &node.children {
        match child {
            ElementChild::Element(inner) => match rewrite_node(inner, rules) {
                Some(new_inner) => {
                    changed = true;
                    children.push(ElementChild::element(new_inner));
                }
                None => children.push(child.clone()),
            },
            ElementChild::Text(_) => children.push(child.clone()),
        }
    }

    if let Some(rewritten) = apply_child_rules(node, &children, rules) {
        children = rewritten;
        changed = true;
    }

    changed.then(|| ElementNode {
        children,
        ..node.clone()
    })
}

/// One node's children, repaired: void shape, ephemeral cleanup, sibling
/// merges, leaf merges, and the nonempty-child invariant, in that order.
fn apply_child_rules(
    node: &ElementNode,
    children: &[ElementChild],
    rules: &[Rule],
) -> Option<Vec<ElementChild>> {
    // Void nodes hold exactly one empty placeholder leaf, nothing else.
    if node.is_void() {
        let well_formed = children.len() == 1
            && matches!(&children[0], ElementChild::Text(leaf) if leaf.is_empty() && leaf.marks.is_empty());
        if well_formed {
            return None;
        }
        return Some(vec![ElementChild::Text(TextLeaf::empty())]);
    }

    let mut out = children.to_vec();
    let mut changed = false;

    for rule in rules {
        match rule {
            Rule::DropEmptyEphemeral { kind } => {
                let before = out.len();
                out.retain(|child| {
                    !matches!(child, ElementChild::Element(e) if e.kind == *kind && is_hollow(e))
                });
                changed |= out.len() != before;
            }
            Rule::MergeAdjacent { kind } => {
                changed |= merge_adjacent_children(&mut out, kind);
            }
            Rule::SingletonRoot { .. } => {}
        }
    }

    changed |= merge_adjacent_leaves(&mut out);

    // Containers never go empty; they keep a placeholder leaf as a cursor
    // target.
    if out.is_empty() {
        out.push(ElementChild::Text(TextLeaf::empty()));
        changed = true;
    }

    changed.then_some(out)
}

/// Fold adjacent element children of `kind` into the earlier sibling,
/// preserving its id and props.
fn merge_adjacent_children(children: &mut Vec<ElementChild>, kind: &str) -> bool {
    let mut changed = false;
    let mut ix = 0;
    while ix + 1 < children.len() {
        let adjacent = matches!(
            (&children[ix], &children[ix + 1]),
            (ElementChild::Element(a), ElementChild::Element(b))
                if a.kind == kind && b.kind == kind
        );
        if !adjacent {
            ix += 1;
            continue;
        }
        let later = children.remove(ix + 1);
        if let (ElementChild::Element(earlier), ElementChild::Element(later)) =
            (&children[ix], &later)
        {
            let mut merged = (**earlier).clone();
            merged.children.extend(later.children.iter().cloned());
            children[ix] = ElementChild::element(merged);
            changed = true;
        }
    }
    changed
}

/// Fold adjacent text leaves whose mark sets are identical.
fn merge_adjacent_leaves(children: &mut Vec<ElementChild>) -> bool {
    let mut changed = false;
    let mut ix = 0;
    while ix + 1 < children.len() {
        let mergeable = matches!(
            (&children[ix], &children[ix + 1]),
            (ElementChild::Text(a), ElementChild::Text(b)) if a.marks == b.marks
        );
        if !mergeable {
            ix += 1;
            continue;
        }
        let later = children.remove(ix + 1);
        if let (ElementChild::Text(earlier), ElementChild::Text(later)) = (&mut children[ix], later)
        {
            earlier.text.push_str(&later.text);
            changed = true;
        }
    }
    changed
}

fn merge_adjacent_roots(value: &mut Vec<Arc<ElementNode>>, kind: &str) -> bool {
    let mut changed = false;
    let mut ix = 0;
    while ix + 1 < value.len() {
        if value[ix].kind == kind && value[ix + 1].kind == kind {
            let later = value.remove(ix + 1);
            let mut merged = (*value[ix]).clone();
            merged.children.extend(later.children.iter().cloned());
            value[ix] = Arc::new(merged);
            changed = true;
        } else {
            ix += 1;
        }
    }
    changed
}

/// Drop hollow ephemeral roots, always leaving at least one root behind.
fn drop_hollow_roots(value: &mut Vec<Arc<ElementNode>>, kind: &str) -> bool {
    let mut changed = false;
    let mut ix = 0;
    while ix < value.len() {
        if value.len() > 1 && value[ix].kind == kind && is_hollow(&value[ix]) {
            value.remove(ix);
            changed = true;
        } else {
            ix += 1;
        }
    }
    changed
}

/// Keep the first top-level instance of a singleton type in place and pull
/// every later instance out, preserving their relative document order.
/// Surplus roots are removed back-to-front so earlier indices stay valid.
fn promote_surplus(value: &mut Vec<Arc<ElementNode>>, kind: &str) -> Vec<Arc<ElementNode>> {
    let occurrences: Vec<usize> = value
        .iter()
        .enumerate()
        .filter(|(_, root)| root.kind == kind)
        .map(|(ix, _)| ix)
        .collect();
    if occurrences.len() < 2 {
        return Vec::new();
    }
    let mut batch = Vec::with_capacity(occurrences.len() - 1);
    for &ix in occurrences[1..].iter().rev() {
        batch.push(value.remove(ix));
    }
    batch.reverse();
    batch
}
